//! Pair kernels and the sequential sweep over the condensed output.
//!
//! This module provides:
//! - The [`PairKernel`] trait: evaluate one association value for a pair of
//!   variables from prepared, read-only statistics. Every blocking strategy
//!   (sequential, tiled, cache-oblivious) is generic over it.
//! - The Pearson kernel on [`Standardized`] series: a dot product of
//!   unit-norm centered series, clamped to `[-1, 1]`.
//! - The tetrachoric kernel on [`Binarized`] series: the cosine-π
//!   approximation applied to the 2×2 contingency table.
//! - [`sequential`], the baseline sweep that writes every pair of an offset
//!   window in plain row-major order.
//!
//! Conventions:
//! - Windows are half-open offset ranges `[lo, hi)` into the condensed
//!   buffer; the `out` slice handed alongside a window is exactly
//!   `hi − lo` long and slot `k` holds offset `lo + k`.
//! - Degenerate pairs (zero-variance series, zero contingency marginals)
//!   evaluate to 0.
use crate::{
    correlation::{
        condensed::{pair_to_offset, row_cols_in_window, rows_in_window},
        options::Algorithm,
        stats::{Binarized, Standardized},
    },
    numerics::{clamp_unit, Real, PI},
};
use std::ops::Range;

/// Association measure evaluated pair by pair from prepared statistics.
///
/// Implementations must be pure: `pair(i, j)` depends only on `(i, j)` and
/// the immutable prepared state, so that any evaluation order and any
/// number of concurrent callers produce identical values.
pub trait PairKernel: Sync {
    /// Number of variables `N`.
    fn n_vars(&self) -> usize;

    /// Bytes of prepared data touched per variable; the blocking strategies
    /// size their tiles and leaves from it.
    fn bytes_per_var(&self) -> usize;

    /// Association between variables `i < j`.
    fn pair(&self, i: usize, j: usize) -> Real;
}

impl PairKernel for Standardized {
    fn n_vars(&self) -> usize {
        Standardized::n_vars(self)
    }

    fn bytes_per_var(&self) -> usize {
        Algorithm::Pearson.bytes_per_var(self.n_obs())
    }

    /// Pearson coefficient `⟨z_i, z_j⟩`, accumulated in `f64`; 0 when either
    /// series is constant.
    #[inline]
    fn pair(&self, i: usize, j: usize) -> Real {
        if self.is_constant(i) || self.is_constant(j) {
            return 0.0;
        }
        let dot: f64 = self
            .series(i)
            .iter()
            .zip(self.series(j))
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum();
        clamp_unit(dot as Real)
    }
}

impl PairKernel for Binarized {
    fn n_vars(&self) -> usize {
        Binarized::n_vars(self)
    }

    fn bytes_per_var(&self) -> usize {
        Algorithm::Tetrachoric.bytes_per_var(self.n_obs())
    }

    /// Tetrachoric coefficient from the joint 2×2 table of `i` and `j`.
    #[inline]
    fn pair(&self, i: usize, j: usize) -> Real {
        let both: u64 = self
            .words(i)
            .iter()
            .zip(self.words(j))
            .map(|(&x, &y)| (x & y).count_ones() as u64)
            .sum();
        tetrachoric(both, self.ones(i), self.ones(j), self.n_obs() as u64)
    }
}

/// Cosine-π approximation of the tetrachoric correlation.
///
/// With the contingency table
///
/// ```text
///              y = 1   y = 0
///     x = 1      a       b
///     x = 0      c       d
/// ```
///
/// the estimate is `r = cos(π / (1 + √(ad/bc)))`, evaluated here as
/// `cos(π·√(bc) / (√(ad) + √(bc)))` so that `bc = 0` gives +1 and `ad = 0`
/// gives −1 without dividing by zero.
///
/// Parameters
/// ----------
/// - `both`: `a`, samples positive in both series.
/// - `ones_x`, `ones_y`: positive-state counts of each series.
/// - `n_obs`: series length `T`.
///
/// Returns
/// -------
/// The estimate in `[-1, 1]`, or 0 when any marginal is empty (one series
/// never or always positive).
pub fn tetrachoric(both: u64, ones_x: u64, ones_y: u64, n_obs: u64) -> Real {
    if ones_x == 0 || ones_y == 0 || ones_x == n_obs || ones_y == n_obs {
        return 0.0;
    }
    let a = both as f64;
    let b = (ones_x - both) as f64;
    let c = (ones_y - both) as f64;
    let d = (n_obs + both - ones_x - ones_y) as f64;

    let root_ad = (a * d).sqrt();
    let root_bc = (b * c).sqrt();
    // Non-empty marginals rule out ad = bc = 0.
    let angle = f64::from(PI) * root_bc / (root_ad + root_bc);
    clamp_unit(angle.cos() as Real)
}

/// Evaluate every pair `(i, j)` with `i ∈ rows`, `j ∈ cols`, `i < j` whose
/// offset falls inside `window`, writing into the window-relative `out`.
#[inline]
pub(crate) fn fill_block<K: PairKernel + ?Sized>(
    kernel: &K, rows: Range<usize>, cols: Range<usize>, window: &Range<usize>, out: &mut [Real],
) {
    let n = kernel.n_vars();
    for i in rows {
        let js = row_cols_in_window(i, cols.clone(), window, n);
        if js.is_empty() {
            continue;
        }
        let start = pair_to_offset(i, js.start, n) - window.start;
        let slots = &mut out[start..start + js.len()];
        for (slot, j) in slots.iter_mut().zip(js) {
            *slot = kernel.pair(i, j);
        }
    }
}

/// Baseline sweep: every pair of `window` in row-major order.
pub fn sequential<K: PairKernel + ?Sized>(kernel: &K, window: Range<usize>, out: &mut [Real]) {
    debug_assert_eq!(out.len(), window.len());
    let n = kernel.n_vars();
    let rows = rows_in_window(&window, n);
    fill_block(kernel, rows, 0..n, &window, out);
}
