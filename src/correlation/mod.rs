//! correlation — pairwise association matrices over multivariate series.
//!
//! Purpose
//! -------
//! Compute the association between every pair of `N` variables observed at
//! `T` time points and store the strict upper triangle of the resulting
//! symmetric matrix in condensed row-major form. Two measures are
//! supported (Pearson and tetrachoric), each runnable under several
//! memory-locality strategies and with or without worker threads.
//!
//! Key behaviors
//! -------------
//! - [`compute`] / [`compute_status`] fill a caller-owned condensed buffer;
//!   [`pairwise`] allocates one and returns a [`CorrMatrix`].
//! - Per-variable statistics are prepared once per call
//!   ([`Standardized`] for Pearson, [`Binarized`] for tetrachoric) and
//!   shared read-only by every worker through the [`PairKernel`] trait.
//! - Blocking strategies (`kernel::sequential`, `tiled::tiled`,
//!   `oblivious::cache_oblivious`) and the thread partitioner
//!   (`partition::run_threaded`) only change the visiting order; all of
//!   them produce bit-identical values.
//! - [`Variant::from_flags`] decodes the host flag word (`TILED`, `THREAD`,
//!   `COBL`) into a typed [`Variant`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Input data is laid out `(T, N)`, one column per variable.
//! - The condensed buffer has length `N·(N−1)/2`; pair `(i, j)` with
//!   `i < j` lives at [`pair_to_offset`]`(i, j, N)`.
//! - Configuration errors are detected before any output slot is written.
//! - Degenerate pairs (constant series, empty contingency marginals) yield
//!   0 rather than an error.
//!
//! Conventions
//! -----------
//! - Errors are reported as [`CorrError`] through [`CorrResult`]; hosts
//!   that need integer codes use [`StatusCode`].
//! - Logging is opt-in (`CorrOptions::verbose`) and compiled only with the
//!   `obs_slog` feature.
//!
//! Downstream usage
//! ----------------
//! - Typical Rust code:
//!
//!   ```rust,ignore
//!   use rust_corrmat::correlation::prelude::*;
//!
//!   let variant = Variant::new(
//!       Algorithm::Pearson,
//!       Blocking::Tiled { tile: 64 },
//!       Threading::available(),
//!   )?;
//!   let corr = pairwise(data.view(), &CorrOptions::new(variant))?;
//!   let r01 = corr.get(0, 1);
//!   ```
//!
//! Testing notes
//! -------------
//! - Each submodule carries its own unit tests; `dispatch` checks
//!   exactly-once writes and cross-variant equality, and the integration
//!   test under `tests/` exercises the public surface end to end.

pub mod condensed;
pub mod dispatch;
pub mod errors;
pub mod kernel;
#[cfg(feature = "obs_slog")]
mod logging;
pub mod oblivious;
pub mod options;
pub mod partition;
pub mod stats;
pub mod tiled;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::condensed::{condensed_len, offset_to_pair, pair_to_offset, to_square, CorrMatrix};
pub use self::dispatch::{compute, compute_status, pairwise};
pub use self::errors::{CorrError, CorrResult, StatusCode};
pub use self::kernel::PairKernel;
pub use self::options::{flags, Algorithm, Blocking, CorrOptions, Threading, Variant};
pub use self::stats::{Binarized, Standardized};
pub use self::tiled::suggest_tile;

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::condensed::CorrMatrix;
    pub use super::dispatch::{compute, pairwise};
    pub use super::errors::{CorrError, CorrResult};
    pub use super::options::{Algorithm, Blocking, CorrOptions, Threading, Variant};
}
