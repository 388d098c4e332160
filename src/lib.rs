//! rust_corrmat — pairwise correlation matrices for multivariate series, with
//! Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that exposes
//! the correlation engine to Python via the `_rust_corrmat` extension module.
//! When the `python-bindings` feature is enabled, this module defines the
//! Python-facing functions and the `correlation` submodule used by the
//! `rust_corrmat` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`correlation`, `numerics`) as the public
//!   crate surface.
//! - Define `#[pyfunction]` wrappers and the `#[pymodule]` initializer for the
//!   `_rust_corrmat` Python extension.
//! - Create and register the `correlation` submodule under `rust_corrmat` so
//!   that dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work is implemented in [`correlation`]; this file performs
//!   only FFI glue, argument decoding, and error mapping.
//! - Python callers pass data laid out `(T, N)`, one column per variable, and
//!   select the blocking/threading variant with the host flag word
//!   (`TILED = 0x10`, `THREAD = 0x20`, `COBL = 0x40`).
//! - The GIL is released while a correlation run executes.
//!
//! Conventions
//! -----------
//! - Configuration errors raise `ValueError`; compute failures raise
//!   `RuntimeError` (see `From<CorrError> for PyErr`).
//! - Results are returned as numpy arrays: the condensed upper triangle by
//!   default, or the full symmetric matrix with `square=True`.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`correlation`] directly and can ignore
//!   the PyO3 items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   integration test under `tests/`. The PyO3 layer is exercised from Python.

pub mod correlation;
pub mod numerics;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::IntoPyArray;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    correlation::{
        condensed::{condensed_len, offset_to_pair, pair_to_offset},
        dispatch::pairwise,
        options::Algorithm,
        tiled,
    },
    utils::{build_options, extract_series_matrix},
};

/// Shared body of `pcc` and `tetracc`.
#[cfg(feature = "python-bindings")]
#[allow(clippy::too_many_arguments)]
fn run_correlation<'py>(
    py: Python<'py>, algorithm: Algorithm, raw_data: &Bound<'py, PyAny>, variant: u32,
    tile: Option<usize>, threads: Option<usize>, square: bool, verbose: bool,
) -> PyResult<PyObject> {
    let arr = extract_series_matrix(py, raw_data)?;
    let data = arr.as_array();
    let opts = build_options(algorithm, variant, tile, threads, verbose)?;

    let corr = py.allow_threads(|| pairwise(data, &opts))?;

    if square {
        Ok(corr.to_square().into_pyarray(py).into_any().unbind())
    } else {
        Ok(corr.into_condensed().into_pyarray(py).into_any().unbind())
    }
}

/// pcc — Pearson correlation of every pair of columns.
///
/// Parameters
/// ----------
/// - `data`: 2-D array-like `(T, N)` of floats.
/// - `variant`: `int`
///   Host flag word; combination of `TILED`, `THREAD`, `COBL`. Defaults to 0
///   (sequential).
/// - `tile`: `Optional[int]`
///   Tile size, required with `TILED` (see `suggest_tile`).
/// - `threads`: `Optional[int]`
///   Worker count, required with `THREAD`.
/// - `square`: `bool`
///   Return the full `N×N` matrix instead of the condensed triangle.
/// - `verbose`: `bool`
///   Emit a run record on stderr (builds with `obs_slog` only).
///
/// Returns
/// -------
/// `numpy.ndarray` of length `N·(N−1)/2`, or `(N, N)` when `square=True`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    signature = (data, variant = 0, tile = None, threads = None, square = false, verbose = false),
    text_signature = "(data, /, variant=0, tile=None, threads=None, square=False, verbose=False)"
)]
pub fn pcc<'py>(
    py: Python<'py>, data: &Bound<'py, PyAny>, variant: u32, tile: Option<usize>,
    threads: Option<usize>, square: bool, verbose: bool,
) -> PyResult<PyObject> {
    run_correlation(py, Algorithm::Pearson, data, variant, tile, threads, square, verbose)
}

/// tetracc — tetrachoric correlation of every pair of columns.
///
/// Each column is binarized at its median before the cosine-π estimate is
/// taken from the pair's 2×2 contingency table. Parameters and return value
/// are those of `pcc`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    signature = (data, variant = 0, tile = None, threads = None, square = false, verbose = false),
    text_signature = "(data, /, variant=0, tile=None, threads=None, square=False, verbose=False)"
)]
pub fn tetracc<'py>(
    py: Python<'py>, data: &Bound<'py, PyAny>, variant: u32, tile: Option<usize>,
    threads: Option<usize>, square: bool, verbose: bool,
) -> PyResult<PyObject> {
    run_correlation(py, Algorithm::Tetrachoric, data, variant, tile, threads, square, verbose)
}

/// Condensed offset of the pair `(i, j)`, `i < j < n`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
pub fn condensed_index(i: usize, j: usize, n: usize) -> PyResult<usize> {
    if i >= j || j >= n {
        return Err(PyValueError::new_err(format!("need i < j < n, got i={i}, j={j}, n={n}")));
    }
    Ok(pair_to_offset(i, j, n))
}

/// Pair `(i, j)` stored at condensed `offset` for `n` variables.
#[cfg(feature = "python-bindings")]
#[pyfunction]
pub fn condensed_pair(offset: usize, n: usize) -> PyResult<(usize, usize)> {
    let len = condensed_len(n);
    if offset >= len {
        return Err(PyValueError::new_err(format!(
            "offset {offset} out of range for n={n} (length {len})"
        )));
    }
    Ok(offset_to_pair(offset, n))
}

/// Tile size that keeps two tiles of prepared series of length `n_obs`
/// within the nominal cache budget.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(signature = (n_obs, tetrachoric = false))]
pub fn suggest_tile(n_obs: usize, tetrachoric: bool) -> usize {
    let algorithm = if tetrachoric { Algorithm::Tetrachoric } else { Algorithm::Pearson };
    tiled::suggest_tile(algorithm.bytes_per_var(n_obs))
}

/// _rust_corrmat — PyO3 module initializer for the Python extension.
///
/// Creates the `correlation` submodule, attaches it to `_rust_corrmat`, and
/// registers it in `sys.modules` so that `rust_corrmat.correlation` is
/// importable by dotted path. The flag constants are exported alongside the
/// functions.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_corrmat<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let correlation_mod = PyModule::new(_py, "correlation")?;
    correlation(_py, m, &correlation_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?
        .getattr("modules")?
        .set_item("rust_corrmat.correlation", correlation_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn correlation<'py>(
    _py: Python, rust_corrmat: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    use crate::correlation::options::flags;

    m.add_function(wrap_pyfunction!(pcc, m)?)?;
    m.add_function(wrap_pyfunction!(tetracc, m)?)?;
    m.add_function(wrap_pyfunction!(condensed_index, m)?)?;
    m.add_function(wrap_pyfunction!(condensed_pair, m)?)?;
    m.add_function(wrap_pyfunction!(suggest_tile, m)?)?;
    m.add("TILED", flags::TILED)?;
    m.add("THREAD", flags::THREAD)?;
    m.add("COBL", flags::COBL)?;
    rust_corrmat.add_submodule(m)?;
    Ok(())
}
