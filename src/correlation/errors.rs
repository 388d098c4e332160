//! correlation::errors — error types, status codes, and Python bridges.
//!
//! Purpose
//! -------
//! Provide the error enum and result alias for pairwise correlation
//! routines, the coarse [`StatusCode`] handed to host environments, and a
//! conversion layer to Python exceptions for PyO3-based bindings.
//!
//! Key behaviors
//! -------------
//! - Define [`CorrResult`] and [`CorrError`] as the canonical result and
//!   error types for configuration validation, statistics preparation, and
//!   kernel execution.
//! - Collapse every [`CorrError`] into one of two non-`Ok` host statuses via
//!   [`CorrError::status`]: configuration errors detected before any output
//!   is written, and compute failures raised while kernels run.
//! - Implement `From<CorrError> for PyErr`, mapping configuration errors to
//!   `ValueError` and compute failures to `RuntimeError`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Degenerate inputs (zero-variance series, degenerate contingency
//!   tables) are *values*, not errors; they never appear here.
//! - A [`StatusCode::InvalidConfig`] result guarantees the output buffer was
//!   not touched. A [`StatusCode::ComputeFailure`] result means the buffer
//!   may hold partial results which callers must discard.
//!
//! Conventions
//! -----------
//! - Error messages are phrased in terms of the violated constraint
//!   ("tile size must be positive") and embed the offending value.
//!
//! Testing notes
//! -------------
//! - Unit tests verify payload embedding in `Display` messages and the
//!   variant → status mapping. The PyO3 conversion is left to Python-level
//!   tests.

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyRuntimeError, PyValueError},
    PyErr,
};

pub type CorrResult<T> = Result<T, CorrError>;

/// StatusCode — coarse outcome of a correlation run for host environments.
///
/// Variants
/// --------
/// - `Ok`
///   Every output slot was written.
/// - `InvalidConfig`
///   A flag or parameter combination was rejected before computation
///   started; the output buffer is untouched.
/// - `ComputeFailure`
///   An internal failure (scratch allocation, worker pool construction)
///   occurred; any output written so far is not valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    InvalidConfig,
    ComputeFailure,
}

impl StatusCode {
    /// Integer form used by C-style hosts: `0` for success, non-zero otherwise.
    pub fn as_i32(self) -> i32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::InvalidConfig => 1,
            StatusCode::ComputeFailure => 2,
        }
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }
}

/// CorrError — failure conditions of a pairwise correlation run.
///
/// Variants
/// --------
/// - `UnknownFlags(bits)`
///   The host flag word carries bits outside the recognized variant mask.
/// - `MissingTileSize`
///   Tiled blocking was requested without a tile size.
/// - `ZeroTileSize`
///   Tiled blocking was requested with a tile size of 0.
/// - `MissingThreadCount`
///   Threading was requested without a thread count.
/// - `ZeroThreadCount`
///   Threading was requested with a thread count of 0.
/// - `EmptySeries`
///   The input has no time points (T = 0) but at least two variables.
/// - `OutputLengthMismatch { expected, actual }`
///   The output buffer does not hold exactly `N·(N−1)/2` elements.
/// - `ScratchAllocation { bytes }`
///   Per-call working storage could not be reserved.
/// - `ThreadPool(reason)`
///   The per-call worker pool could not be built.
///
/// Notes
/// -----
/// - The first seven variants map to [`StatusCode::InvalidConfig`], the
///   last two to [`StatusCode::ComputeFailure`].
#[derive(Debug, Clone, PartialEq)]
pub enum CorrError {
    //------ Configuration errors ------
    UnknownFlags(u32),
    MissingTileSize,
    ZeroTileSize,
    MissingThreadCount,
    ZeroThreadCount,
    EmptySeries,
    OutputLengthMismatch { expected: usize, actual: usize },

    //------ Compute failures ------
    ScratchAllocation { bytes: usize },
    ThreadPool(String),
}

impl CorrError {
    /// Map this error onto the host-facing status code.
    pub fn status(&self) -> StatusCode {
        match self {
            CorrError::UnknownFlags(_)
            | CorrError::MissingTileSize
            | CorrError::ZeroTileSize
            | CorrError::MissingThreadCount
            | CorrError::ZeroThreadCount
            | CorrError::EmptySeries
            | CorrError::OutputLengthMismatch { .. } => StatusCode::InvalidConfig,
            CorrError::ScratchAllocation { .. } | CorrError::ThreadPool(_) => {
                StatusCode::ComputeFailure
            }
        }
    }
}

impl std::error::Error for CorrError {}

impl std::fmt::Display for CorrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrError::UnknownFlags(bits) => {
                write!(f, "Unknown variant flag bits: {bits:#x}.")
            }
            CorrError::MissingTileSize => {
                write!(f, "Tiled blocking requires a tile size.")
            }
            CorrError::ZeroTileSize => {
                write!(f, "Invalid tile size: 0. Must be positive under tiled blocking.")
            }
            CorrError::MissingThreadCount => {
                write!(f, "Threaded execution requires a thread count.")
            }
            CorrError::ZeroThreadCount => {
                write!(f, "Invalid thread count: 0. Must be positive under threaded execution.")
            }
            CorrError::EmptySeries => {
                write!(f, "Need at least 1 time point per variable.")
            }
            CorrError::OutputLengthMismatch { expected, actual } => {
                write!(f, "Output buffer has {actual} elements; expected N·(N−1)/2 = {expected}.")
            }
            CorrError::ScratchAllocation { bytes } => {
                write!(f, "Failed to reserve {bytes} bytes of scratch storage.")
            }
            CorrError::ThreadPool(reason) => {
                write!(f, "Failed to build worker pool: {reason}")
            }
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for CorrError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        CorrError::ThreadPool(err.to_string())
    }
}

#[cfg(feature = "python-bindings")]
impl From<CorrError> for PyErr {
    fn from(err: CorrError) -> PyErr {
        match err.status() {
            StatusCode::ComputeFailure => PyRuntimeError::new_err(format!("CorrError: {err}")),
            _ => PyValueError::new_err(format!("CorrError: {err}")),
        }
    }
}
