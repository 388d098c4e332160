//! correlation::dispatch — entry points that run one variant end to end.
//!
//! Purpose
//! -------
//! Compose the pieces of a correlation run: validate the configuration and
//! shapes, prepare per-variable statistics for the chosen algorithm, and
//! drive the chosen blocking strategy either inline or through the
//! partitioner.
//!
//! Key behaviors
//! -------------
//! - [`compute`] writes into a caller-owned condensed buffer and reports a
//!   typed error; [`compute_status`] is the same call reduced to a
//!   [`StatusCode`] for hosts that work with integer codes.
//! - [`pairwise`] allocates the condensed buffer and returns it wrapped in a
//!   [`CorrMatrix`].
//! - Every variant evaluates the same pure pair kernel, so results are
//!   bit-identical across blocking and threading choices.
//!
//! Invariants & assumptions
//! ------------------------
//! - All validation happens before the output buffer is touched. A rejected
//!   call leaves `out` exactly as it was passed in.
//! - `data` is laid out `(T, N)`: one column per variable.
//! - `N ≤ 1` is a successful no-op with an empty output.
//!
//! Conventions
//! -----------
//! - With the `obs_slog` feature and `verbose = true`, one structured record
//!   is logged per successful call. Kernels never log.
//!
//! Testing notes
//! -------------
//! - Unit tests run every blocking × threading combination against an
//!   instrumented kernel (each offset written exactly once), against the
//!   sequential baseline on real data, and through the rejection paths.

use crate::{
    correlation::{
        condensed::{condensed_len, CorrMatrix},
        errors::{CorrResult, StatusCode},
        kernel::{sequential, PairKernel},
        oblivious::cache_oblivious,
        options::{Algorithm, Blocking, CorrOptions, Threading, Variant},
        partition::run_threaded,
        stats::{try_buffer, Binarized, Standardized},
        tiled::tiled,
        validation::{validate_shapes, validate_variant},
    },
    numerics::Real,
};
use ndarray::ArrayView2;
use std::ops::Range;

#[cfg(feature = "obs_slog")]
use crate::correlation::logging::{log_run, RunRecord};

/// Compute every pairwise association of `data` into `out`.
///
/// Parameters
/// ----------
/// - `data`: `ArrayView2<Real>`
///   Observations laid out `(T, N)`.
/// - `opts`: `&CorrOptions`
///   Variant and verbosity.
/// - `out`: `&mut [Real]`
///   Condensed output of length `N·(N−1)/2`; slot `pair_to_offset(i, j, N)`
///   receives the association of variables `i < j`.
///
/// Errors
/// ------
/// - `CorrError::ZeroTileSize` / `CorrError::ZeroThreadCount` for invalid
///   hand-built variants.
/// - `CorrError::OutputLengthMismatch` / `CorrError::EmptySeries` for bad
///   shapes.
/// - `CorrError::ScratchAllocation` when prepared statistics cannot be
///   allocated.
/// - `CorrError::ThreadPool` when the worker pool cannot be built.
pub fn compute(data: ArrayView2<'_, Real>, opts: &CorrOptions, out: &mut [Real]) -> CorrResult<()> {
    let variant = opts.variant;
    let (n_obs, n_vars) = data.dim();
    validate_variant(&variant)?;
    validate_shapes(n_obs, n_vars, out.len())?;
    if out.is_empty() {
        return Ok(());
    }

    #[cfg(feature = "obs_slog")]
    let started = std::time::Instant::now();

    match variant.algorithm {
        Algorithm::Pearson => run(&Standardized::prepare(data)?, &variant, out)?,
        Algorithm::Tetrachoric => run(&Binarized::prepare(data)?, &variant, out)?,
    }

    #[cfg(feature = "obs_slog")]
    {
        if opts.verbose {
            log_run(&RunRecord {
                variant,
                n_vars,
                n_obs,
                pairs: out.len(),
                elapsed: started.elapsed(),
            });
        }
    }
    Ok(())
}

/// [`compute`] reduced to a host status code.
pub fn compute_status(data: ArrayView2<'_, Real>, opts: &CorrOptions, out: &mut [Real]) -> StatusCode {
    match compute(data, opts, out) {
        Ok(()) => StatusCode::Ok,
        Err(err) => err.status(),
    }
}

/// Allocate a condensed buffer and fill it with [`compute`].
pub fn pairwise(data: ArrayView2<'_, Real>, opts: &CorrOptions) -> CorrResult<CorrMatrix> {
    let n_vars = data.ncols();
    // Checked up front so a bad variant never allocates.
    validate_variant(&opts.variant)?;
    let len = condensed_len(n_vars);
    let mut values: Vec<Real> = try_buffer(len)?;
    values.resize(len, 0.0);
    compute(data, opts, &mut values)?;
    Ok(CorrMatrix::from_parts(values, n_vars))
}

fn run<K: PairKernel>(kernel: &K, variant: &Variant, out: &mut [Real]) -> CorrResult<()> {
    let blocking = variant.blocking;
    let work = |window: Range<usize>, chunk: &mut [Real]| run_window(kernel, &blocking, window, chunk);
    match variant.threading {
        Threading::Single => {
            work(0..out.len(), out);
            Ok(())
        }
        Threading::Threaded { threads } => run_threaded(threads, out, work),
    }
}

/// Evaluate one offset window with the requested blocking strategy.
pub(crate) fn run_window<K: PairKernel + ?Sized>(
    kernel: &K, blocking: &Blocking, window: Range<usize>, out: &mut [Real],
) {
    match *blocking {
        Blocking::None => sequential(kernel, window, out),
        Blocking::Tiled { tile } => tiled(kernel, tile, window, out),
        Blocking::CacheOblivious { min_tile } => cache_oblivious(kernel, min_tile, window, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{
        condensed::{offset_to_pair, pair_to_offset},
        errors::CorrError,
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Exactly-once writes and correct placement for every blocking ×
    //   threading combination.
    // - Agreement of all variants with the sequential baseline on real data.
    // - Small hand-computed scenarios and degenerate series.
    // - Rejected calls leaving the output untouched.
    // -------------------------------------------------------------------------

    /// Kernel that records every evaluation and returns an encoding of its
    /// offset, so misplaced or repeated writes are detectable.
    struct CountingKernel {
        n: usize,
        hits: Vec<AtomicUsize>,
    }

    impl CountingKernel {
        fn new(n: usize) -> Self {
            let hits = (0..condensed_len(n)).map(|_| AtomicUsize::new(0)).collect();
            CountingKernel { n, hits }
        }
    }

    impl PairKernel for CountingKernel {
        fn n_vars(&self) -> usize {
            self.n
        }

        fn bytes_per_var(&self) -> usize {
            64
        }

        fn pair(&self, i: usize, j: usize) -> Real {
            let offset = pair_to_offset(i, j, self.n);
            self.hits[offset].fetch_add(1, Ordering::Relaxed);
            offset as Real
        }
    }

    fn all_variants(algorithm: Algorithm) -> Vec<Variant> {
        let blockings = [
            Blocking::None,
            Blocking::Tiled { tile: 1 },
            Blocking::Tiled { tile: 3 },
            Blocking::Tiled { tile: 64 },
            Blocking::CacheOblivious { min_tile: 0 },
            Blocking::CacheOblivious { min_tile: 1 },
        ];
        let threadings = [
            Threading::Single,
            Threading::Threaded { threads: 1 },
            Threading::Threaded { threads: 3 },
            Threading::Threaded { threads: 8 },
        ];
        let mut variants = Vec::new();
        for blocking in blockings {
            for threading in threadings {
                variants.push(Variant { algorithm, blocking, threading });
            }
        }
        variants
    }

    fn sample(n_obs: usize, n_vars: usize) -> Array2<Real> {
        Array2::from_shape_fn((n_obs, n_vars), |(t, v)| {
            let x = (t as Real) * 0.31 + (v as Real) * 1.7;
            x.sin() * (1.0 + v as Real * 0.1) + ((t * (v + 1)) % 11) as Real * 0.05
        })
    }

    #[test]
    // Purpose
    // -------
    // Ensure every offset is evaluated exactly once and lands in its own slot
    // for every blocking × threading combination.
    //
    // Given
    // -----
    // - N ∈ {2, 5, 19} with a counting kernel.
    //
    // Expect
    // ------
    // - out[k] == k and one hit per offset.
    fn every_variant_writes_each_offset_once() {
        for n in [2, 5, 19] {
            for variant in all_variants(Algorithm::Pearson) {
                // Arrange
                let kernel = CountingKernel::new(n);
                let mut out = vec![Real::NAN; condensed_len(n)];

                // Act
                run(&kernel, &variant, &mut out).expect("run should succeed");

                // Assert
                for (k, v) in out.iter().enumerate() {
                    assert_eq!(*v, k as Real, "n = {n}, variant = {variant:?}");
                    assert_eq!(
                        kernel.hits[k].load(Ordering::Relaxed),
                        1,
                        "n = {n}, variant = {variant:?}, pair = {:?}",
                        offset_to_pair(k, n)
                    );
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the hand-computed three-variable scenario for both algorithms
    // across all variants.
    //
    // Given
    // -----
    // - x = [1, 2, 3, 4], y = 2x, z = −x.
    //
    // Expect
    // ------
    // - Condensed output [1, −1, −1] (pairs (0,1), (0,2), (1,2)).
    fn linear_scenario_matches_for_all_variants() {
        // Arrange
        let data: Array2<Real> =
            array![[1.0, 2.0, -1.0], [2.0, 4.0, -2.0], [3.0, 6.0, -3.0], [4.0, 8.0, -4.0]];

        for algorithm in [Algorithm::Pearson, Algorithm::Tetrachoric] {
            for variant in all_variants(algorithm) {
                // Act
                let mut out = vec![Real::NAN; 3];
                compute(data.view(), &CorrOptions::new(variant), &mut out)
                    .expect("compute should succeed");

                // Assert
                for (got, want) in out.iter().zip([1.0, -1.0, -1.0]) {
                    assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure a constant series yields 0 against every other series while the
    // remaining pairs are unaffected.
    //
    // Given
    // -----
    // - Columns: ramp, constant 5, reversed ramp.
    //
    // Expect
    // ------
    // - [0, −1, 0] for Pearson; 0 for every pair touching the constant
    //   column under tetrachoric.
    fn constant_series_yields_zero() {
        // Arrange
        let data: Array2<Real> = array![[1.0, 5.0, 4.0], [2.0, 5.0, 3.0], [3.0, 5.0, 2.0], [4.0, 5.0, 1.0]];

        // Act
        let pearson = pairwise(data.view(), &CorrOptions::default()).expect("pearson should succeed");
        let tetra = pairwise(
            data.view(),
            &CorrOptions::new(Variant::sequential(Algorithm::Tetrachoric)),
        )
        .expect("tetrachoric should succeed");

        // Assert
        assert_eq!(pearson.get(0, 1), 0.0);
        assert_abs_diff_eq!(pearson.get(0, 2), -1.0, epsilon = 1e-6);
        assert_eq!(pearson.get(1, 2), 0.0);
        assert_eq!(tetra.get(0, 1), 0.0);
        assert_eq!(tetra.get(1, 2), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify bit-identical results across thread counts and blockings.
    //
    // Given
    // -----
    // - N ∈ {5, 23, 50}, T ∈ {10, 77, 200}.
    //
    // Expect
    // ------
    // - Every variant equals the sequential baseline exactly.
    fn variants_agree_with_sequential_baseline() {
        for (n_obs, n_vars) in [(10, 5), (77, 23), (200, 50)] {
            let data = sample(n_obs, n_vars);
            for algorithm in [Algorithm::Pearson, Algorithm::Tetrachoric] {
                // Arrange
                let baseline = pairwise(data.view(), &CorrOptions::new(Variant::sequential(algorithm)))
                    .expect("baseline should succeed");

                for variant in all_variants(algorithm) {
                    // Act
                    let got = pairwise(data.view(), &CorrOptions::new(variant))
                        .expect("variant should succeed");

                    // Assert
                    assert_eq!(
                        got.as_condensed(),
                        baseline.as_condensed(),
                        "T = {n_obs}, N = {n_vars}, variant = {variant:?}"
                    );
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure rejected calls report the right status and leave the output
    // untouched.
    //
    // Given
    // -----
    // - A zero-thread variant, a zero-tile variant, a short buffer, and T = 0.
    //
    // Expect
    // ------
    // - InvalidConfig and the sentinel-filled buffer preserved.
    fn rejected_calls_leave_output_untouched() {
        let data = sample(12, 4);
        let bad_threads = Variant {
            algorithm: Algorithm::Pearson,
            blocking: Blocking::None,
            threading: Threading::Threaded { threads: 0 },
        };
        let bad_tile = Variant {
            algorithm: Algorithm::Tetrachoric,
            blocking: Blocking::Tiled { tile: 0 },
            threading: Threading::Single,
        };

        for variant in [bad_threads, bad_tile] {
            let mut out = vec![7.0; 6];
            let status = compute_status(data.view(), &CorrOptions::new(variant), &mut out);
            assert_eq!(status, StatusCode::InvalidConfig);
            assert!(out.iter().all(|v| *v == 7.0));
        }

        let mut short = vec![7.0; 5];
        assert_eq!(
            compute(data.view(), &CorrOptions::default(), &mut short),
            Err(CorrError::OutputLengthMismatch { expected: 6, actual: 5 })
        );
        assert!(short.iter().all(|v| *v == 7.0));

        let empty: Array2<Real> = Array2::zeros((0, 4));
        let mut out = vec![7.0; 6];
        assert_eq!(
            compute_status(empty.view(), &CorrOptions::default(), &mut out),
            StatusCode::InvalidConfig
        );
        assert!(out.iter().all(|v| *v == 7.0));
    }

    #[test]
    // Purpose
    // -------
    // Verify the trivial N ≤ 1 path.
    //
    // Given
    // -----
    // - One variable with T = 3; zero variables with T = 0.
    //
    // Expect
    // ------
    // - Ok with empty condensed output.
    fn single_variable_is_noop() {
        let one: Array2<Real> = array![[1.0], [2.0], [3.0]];
        let none: Array2<Real> = Array2::zeros((0, 0));
        let a = pairwise(one.view(), &CorrOptions::default()).expect("N = 1 should succeed");
        let b = pairwise(none.view(), &CorrOptions::default()).expect("N = 0 should succeed");
        assert!(a.as_condensed().is_empty());
        assert_eq!(a.n_vars(), 1);
        assert!(b.as_condensed().is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Ensure worker counts far beyond the pair count and the hardware are
    // accepted and change nothing.
    //
    // Given
    // -----
    // - N = 6 and N = 40 with threads = usize::MAX under every blocking.
    //
    // Expect
    // ------
    // - StatusCode::Ok and output identical to the sequential run.
    fn oversized_thread_count_matches_sequential() {
        for n_vars in [6, 40] {
            let data = sample(25, n_vars);
            for algorithm in [Algorithm::Pearson, Algorithm::Tetrachoric] {
                // Arrange
                let baseline = pairwise(data.view(), &CorrOptions::new(Variant::sequential(algorithm)))
                    .expect("baseline should succeed");

                for blocking in [
                    Blocking::None,
                    Blocking::Tiled { tile: 5 },
                    Blocking::CacheOblivious { min_tile: 0 },
                ] {
                    let variant = Variant {
                        algorithm,
                        blocking,
                        threading: Threading::Threaded { threads: usize::MAX },
                    };
                    let mut out = vec![Real::NAN; condensed_len(n_vars)];

                    // Act
                    let status = compute_status(data.view(), &CorrOptions::new(variant), &mut out);

                    // Assert
                    assert!(status.is_ok(), "variant = {variant:?}");
                    assert_eq!(out.as_slice(), baseline.as_condensed(), "variant = {variant:?}");
                }
            }
        }
    }
}
