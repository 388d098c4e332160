//! utils — conversion helpers for the Python bindings.
//!
//! Turns loosely typed Python arguments (array-likes, flag words, optional
//! positional parameters) into the typed inputs of the `correlation`
//! module. Compiled only with the `python-bindings` feature.

#[cfg(feature = "python-bindings")]
use ndarray::Array2;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Array2 → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
use crate::{
    correlation::options::{Algorithm, CorrOptions, Variant},
    numerics::Real,
};

/// Accept a `(T, N)` numpy array, a pandas DataFrame, or a nested sequence
/// of rows, in that order of preference.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_series_matrix<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray2<'py, Real>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<Real>>() {
        return Ok(arr_ro);
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<Real>>() {
            return Ok(frame_ro);
        }
    }

    let rows: Vec<Vec<Real>> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err(
            "expected a 2-D numpy.ndarray, pandas.DataFrame, or sequence of rows of floats",
        )
    })?;
    let n_obs = rows.len();
    let n_vars = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|row| row.len() != n_vars) {
        return Err(PyTypeError::new_err("all rows of data must have the same length"));
    }
    let flat: Vec<Real> = rows.into_iter().flatten().collect();
    let matrix = Array2::from_shape_vec((n_obs, n_vars), flat)
        .map_err(|e| PyTypeError::new_err(format!("could not shape data as (T, N): {e}")))?;
    Ok(matrix.into_pyarray(py).readonly())
}

/// Build run options from the host calling convention.
///
/// The flag word and its positional parameters are decoded strictly by
/// [`Variant::from_flags`]: `TILED` without a tile size is rejected.
#[cfg(feature = "python-bindings")]
pub fn build_options(
    algorithm: Algorithm, variant: u32, tile: Option<usize>, threads: Option<usize>,
    verbose: bool,
) -> PyResult<CorrOptions> {
    let variant = Variant::from_flags(algorithm, variant, tile, threads)?;
    Ok(CorrOptions::new(variant).with_verbose(verbose))
}
