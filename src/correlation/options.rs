//! Correlation options — variant selection and run configuration.
//!
//! Purpose
//! -------
//! Describe *which* pairwise computation to run as an explicit, typed value
//! with one named field per orthogonal axis, instead of a flag word that
//! every call site re-decodes:
//!
//! - [`Algorithm`]: Pearson or tetrachoric.
//! - [`Blocking`]: none, tiled with an explicit tile size, or
//!   cache-oblivious.
//! - [`Threading`]: single-threaded or a fixed number of workers.
//!
//! Key behaviors
//! -------------
//! - [`Variant::new`] validates a combination once; [`Variant::from_flags`]
//!   decodes a host flag word plus the optional positional tile size and
//!   thread count into the same typed value.
//! - [`CorrOptions`] bundles a validated [`Variant`] with run-level knobs
//!   (currently the `verbose` switch consumed by the `obs_slog` run log).
//!
//! Invariants & assumptions
//! ------------------------
//! - `Blocking::Tiled { tile }` requires `tile > 0`.
//! - `Threading::Threaded { threads }` requires `threads > 0`.
//! - Cache-oblivious blocking overrides any supplied tile size; its
//!   `min_tile` of 0 means the leaf size is derived automatically.
//! - Fields are public so callers can pattern-match; the dispatcher
//!   re-validates the variant it receives, so hand-built values cannot
//!   bypass the checks above.
//!
//! Conventions
//! -----------
//! - Flag bits follow the host convention: [`flags::TILED`],
//!   [`flags::THREAD`], [`flags::COBL`]. The algorithm is chosen by the
//!   entry point, not by a bit.
//!
//! Testing notes
//! -------------
//! - Unit tests cover flag decoding for every accepted combination and each
//!   rejection path, plus the flag round trip through [`Variant::flags`].
use crate::{
    correlation::{
        errors::{CorrError, CorrResult},
        validation::validate_variant,
    },
    numerics::Real,
};

/// Host flag bits selecting the blocking and threading axes.
pub mod flags {
    /// Tile the pair space with an explicit tile size.
    pub const TILED: u32 = 0x10;
    /// Run on a fixed number of worker threads.
    pub const THREAD: u32 = 0x20;
    /// Cache-oblivious recursive blocking; overrides `TILED`.
    pub const COBL: u32 = 0x40;
    /// Every recognized bit.
    pub const MASK: u32 = TILED | THREAD | COBL;
}

/// Association measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Pearson,
    Tetrachoric,
}

impl Algorithm {
    /// Bytes of prepared data per variable for series of length `n_obs`:
    /// `T` reals for Pearson, `⌈T/64⌉` packed words for tetrachoric.
    pub fn bytes_per_var(&self, n_obs: usize) -> usize {
        match self {
            Algorithm::Pearson => n_obs * std::mem::size_of::<Real>(),
            Algorithm::Tetrachoric => n_obs.div_ceil(64) * std::mem::size_of::<u64>(),
        }
    }
}

/// Memory-locality strategy over the pair space.
///
/// - `None`: plain row-major sweep.
/// - `Tiled { tile }`: square tiles of `tile` variables per side.
/// - `CacheOblivious { min_tile }`: recursive bisection; `min_tile = 0`
///   derives the leaf size from the per-variable footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blocking {
    None,
    Tiled { tile: usize },
    CacheOblivious { min_tile: usize },
}

/// Execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Threading {
    Single,
    Threaded { threads: usize },
}

impl Threading {
    /// One worker per unit of available hardware parallelism (at least 1).
    pub fn available() -> Self {
        let threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Threading::Threaded { threads }
    }

    /// Number of workers this mode runs on.
    pub fn workers(&self) -> usize {
        match self {
            Threading::Single => 1,
            Threading::Threaded { threads } => *threads,
        }
    }
}

/// Variant — one point in the algorithm × blocking × threading space.
///
/// Fields
/// ------
/// - `algorithm`: [`Algorithm`]
/// - `blocking`: [`Blocking`]
/// - `threading`: [`Threading`]
///
/// Invariants
/// ----------
/// - Values returned by [`Variant::new`], [`Variant::sequential`], and
///   [`Variant::from_flags`] satisfy the tile/thread positivity checks in
///   [`validate_variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variant {
    pub algorithm: Algorithm,
    pub blocking: Blocking,
    pub threading: Threading,
}

impl Variant {
    /// Build and validate a variant.
    ///
    /// Errors
    /// ------
    /// - `CorrError::ZeroTileSize` for `Blocking::Tiled { tile: 0 }`.
    /// - `CorrError::ZeroThreadCount` for `Threading::Threaded { threads: 0 }`.
    pub fn new(algorithm: Algorithm, blocking: Blocking, threading: Threading) -> CorrResult<Self> {
        let variant = Variant { algorithm, blocking, threading };
        validate_variant(&variant)?;
        Ok(variant)
    }

    /// Unblocked, single-threaded baseline for `algorithm`.
    pub fn sequential(algorithm: Algorithm) -> Self {
        Variant { algorithm, blocking: Blocking::None, threading: Threading::Single }
    }

    /// Decode a host flag word and its optional positional parameters.
    ///
    /// Parameters
    /// ----------
    /// - `algorithm`: [`Algorithm`]
    ///   Chosen by the entry point.
    /// - `bits`: `u32`
    ///   Combination of [`flags::TILED`], [`flags::THREAD`], [`flags::COBL`].
    /// - `tile`: `Option<usize>`
    ///   Required when `TILED` is set without `COBL`; ignored otherwise.
    /// - `threads`: `Option<usize>`
    ///   Required when `THREAD` is set; ignored otherwise.
    ///
    /// Errors
    /// ------
    /// - `CorrError::UnknownFlags` when `bits` has bits outside [`flags::MASK`].
    /// - `CorrError::MissingTileSize` / `CorrError::ZeroTileSize` for plain
    ///   tiled mode without a positive tile size.
    /// - `CorrError::MissingThreadCount` / `CorrError::ZeroThreadCount` for
    ///   threaded mode without a positive thread count.
    pub fn from_flags(
        algorithm: Algorithm, bits: u32, tile: Option<usize>, threads: Option<usize>,
    ) -> CorrResult<Self> {
        let unknown = bits & !flags::MASK;
        if unknown != 0 {
            return Err(CorrError::UnknownFlags(unknown));
        }

        let blocking = if bits & flags::COBL != 0 {
            Blocking::CacheOblivious { min_tile: 0 }
        } else if bits & flags::TILED != 0 {
            match tile {
                None => return Err(CorrError::MissingTileSize),
                Some(tile) => Blocking::Tiled { tile },
            }
        } else {
            Blocking::None
        };

        let threading = if bits & flags::THREAD != 0 {
            match threads {
                None => return Err(CorrError::MissingThreadCount),
                Some(threads) => Threading::Threaded { threads },
            }
        } else {
            Threading::Single
        };

        Variant::new(algorithm, blocking, threading)
    }

    /// Host flag word describing this variant's blocking and threading axes.
    pub fn flags(&self) -> u32 {
        let blocking = match self.blocking {
            Blocking::None => 0,
            Blocking::Tiled { .. } => flags::TILED,
            Blocking::CacheOblivious { .. } => flags::COBL,
        };
        let threading = match self.threading {
            Threading::Single => 0,
            Threading::Threaded { .. } => flags::THREAD,
        };
        blocking | threading
    }
}

/// CorrOptions — run configuration for a pairwise correlation call.
///
/// Fields
/// ------
/// - `variant`: [`Variant`]
///   Algorithm and kernel composition.
/// - `verbose`: `bool`
///   Emit one structured run record per call. Only has an effect when the
///   crate is built with the `obs_slog` feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrOptions {
    pub variant: Variant,
    pub verbose: bool,
}

impl CorrOptions {
    pub fn new(variant: Variant) -> Self {
        CorrOptions { variant, verbose: false }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for CorrOptions {
    /// Sequential Pearson, quiet.
    fn default() -> Self {
        CorrOptions::new(Variant::sequential(Algorithm::Pearson))
    }
}
