//! correlation::validation — fail-fast precondition checks.
//!
//! Purpose
//! -------
//! Centralize every check that must pass before a correlation run touches
//! its output buffer, so that a rejected call leaves the buffer exactly as
//! the caller handed it in.
//!
//! Key behaviors
//! -------------
//! - [`validate_variant`] enforces the per-axis parameter constraints of a
//!   [`Variant`].
//! - [`validate_shapes`] checks the data dimensions against the output
//!   buffer length.
//!
//! Invariants & assumptions
//! ------------------------
//! - A tiled variant needs `tile > 0`; a threaded variant needs
//!   `threads > 0`. Cache-oblivious `min_tile` may be 0.
//! - The output buffer must hold exactly `N·(N−1)/2` elements.
//! - At least one time point is required when there is at least one pair.
//!   With `N ≤ 1` there is nothing to compute and any `T` is accepted.
//!
//! Conventions
//! -----------
//! - Pure functions; no allocation, no logging.
//!
//! Testing notes
//! -------------
//! - Unit tests cover every error branch and the trivial `N ≤ 1` path.

use crate::correlation::{
    condensed::condensed_len,
    errors::{CorrError, CorrResult},
    options::{Blocking, Threading, Variant},
};

/// Validate the parameter constraints of each axis of `variant`.
///
/// Errors
/// ------
/// - `CorrError::ZeroTileSize`
///   Returned for `Blocking::Tiled { tile: 0 }`.
/// - `CorrError::ZeroThreadCount`
///   Returned for `Threading::Threaded { threads: 0 }`.
pub fn validate_variant(variant: &Variant) -> CorrResult<()> {
    if let Blocking::Tiled { tile: 0 } = variant.blocking {
        return Err(CorrError::ZeroTileSize);
    }
    if let Threading::Threaded { threads: 0 } = variant.threading {
        return Err(CorrError::ZeroThreadCount);
    }
    Ok(())
}

/// Validate data dimensions against the output buffer.
///
/// Parameters
/// ----------
/// - `n_obs`: `usize`
///   Number of time points `T`.
/// - `n_vars`: `usize`
///   Number of variables `N`.
/// - `out_len`: `usize`
///   Length of the caller's output buffer.
///
/// Errors
/// ------
/// - `CorrError::OutputLengthMismatch`
///   Returned when `out_len != N·(N−1)/2`.
/// - `CorrError::EmptySeries`
///   Returned when `T = 0` and `N ≥ 2`.
pub fn validate_shapes(n_obs: usize, n_vars: usize, out_len: usize) -> CorrResult<()> {
    let expected = condensed_len(n_vars);
    if out_len != expected {
        return Err(CorrError::OutputLengthMismatch { expected, actual: out_len });
    }
    if expected > 0 && n_obs == 0 {
        return Err(CorrError::EmptySeries);
    }
    Ok(())
}
