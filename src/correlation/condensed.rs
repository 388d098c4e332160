//! correlation::condensed — condensed upper-triangle indexing.
//!
//! Purpose
//! -------
//! Map unordered variable pairs `(i, j)` with `i < j < n` onto linear
//! offsets of a condensed output buffer of length `n·(n−1)/2`, and back.
//! The inverse map is what lets the thread partitioner cut the output into
//! contiguous offset ranges and still know which pairs each range holds.
//!
//! Key behaviors
//! -------------
//! - Row-major enumeration: fix `i`, enumerate `j = i+1, …, n−1`. Row `i`
//!   therefore occupies the contiguous range
//!   `[row_start(i), row_start(i) + n − 1 − i)`.
//! - [`offset_to_pair`] estimates the row in closed form and then corrects
//!   it with exact integer arithmetic, so it never drifts for large `n`.
//! - [`CorrMatrix`] owns a condensed result and expands it on demand.
//!
//! Invariants & assumptions
//! ------------------------
//! - Callers guarantee `i < j < n` and `offset < condensed_len(n)`; these
//!   are checked with `debug_assert!` only.
//! - `pair_to_offset` and `offset_to_pair` are mutually inverse bijections
//!   between `{(i, j) : 0 ≤ i < j < n}` and `[0, n·(n−1)/2)`.
//!
//! Testing notes
//! -------------
//! - Unit tests check the explicit enumeration for a small `n`, the
//!   round-trip property under `proptest`, and square expansion.

use crate::numerics::Real;
use ndarray::Array2;
use std::ops::Range;

/// Number of unordered pairs among `n` variables, `n·(n−1)/2` (0 for `n ≤ 1`).
#[inline]
pub fn condensed_len(n: usize) -> usize {
    if n < 2 { 0 } else { n * (n - 1) / 2 }
}

/// Offset of the first pair `(i, i+1)` in row `i`.
#[inline]
pub fn row_start(i: usize, n: usize) -> usize {
    debug_assert!(i < n);
    // i·(2n − i − 1) is always even: one of i, (2n − i − 1) is even.
    i * (2 * n - i - 1) / 2
}

/// Linear offset of the pair `(i, j)`, `i < j < n`.
#[inline]
pub fn pair_to_offset(i: usize, j: usize, n: usize) -> usize {
    debug_assert!(i < j && j < n, "pair ({i}, {j}) outside upper triangle of {n}");
    row_start(i, n) + (j - i - 1)
}

/// Pair `(i, j)` stored at `offset`, `offset < n·(n−1)/2`.
///
/// Offsets are mirrored (`k = len − 1 − offset`) so that the rows counted
/// from the bottom have sizes 1, 2, 3, …; the mirrored row `r` then solves
/// `r·(r+1)/2 ≤ k < (r+1)·(r+2)/2`, estimated with a square root and fixed
/// up in integers.
pub fn offset_to_pair(offset: usize, n: usize) -> (usize, usize) {
    let total = condensed_len(n);
    debug_assert!(offset < total, "offset {offset} outside condensed length {total}");

    let k = total - 1 - offset;
    let mut r = (((8.0 * k as f64 + 1.0).sqrt() - 1.0) / 2.0) as usize;
    while r > 0 && r * (r + 1) / 2 > k {
        r -= 1;
    }
    while (r + 1) * (r + 2) / 2 <= k {
        r += 1;
    }

    let i = n - 2 - r;
    let j = offset - row_start(i, n) + i + 1;
    (i, j)
}

/// Offsets held by row `i` that also fall inside `window`, expressed as a
/// column range `[j_lo, j_hi)` intersected with `cols`.
///
/// Returns an empty range when the row and window do not overlap.
#[inline]
pub(crate) fn row_cols_in_window(
    i: usize, cols: Range<usize>, window: &Range<usize>, n: usize,
) -> Range<usize> {
    let base = row_start(i, n);
    // Column j of row i sits at base + j − i − 1.
    let win_lo = (window.start + i + 1).saturating_sub(base);
    let win_hi = (window.end + i + 1).saturating_sub(base);
    let lo = cols.start.max(i + 1).max(win_lo);
    let hi = cols.end.min(n).min(win_hi);
    lo..hi.max(lo)
}

/// Rows whose pairs intersect `window` (inclusive of partially covered rows).
pub(crate) fn rows_in_window(window: &Range<usize>, n: usize) -> Range<usize> {
    if window.is_empty() {
        return 0..0;
    }
    let (first, _) = offset_to_pair(window.start, n);
    let (last, _) = offset_to_pair(window.end - 1, n);
    first..last + 1
}

/// Expand a condensed buffer into a symmetric `n×n` matrix with unit diagonal.
///
/// Panics
/// ------
/// - If `values.len() != condensed_len(n)`.
pub fn to_square(values: &[Real], n: usize) -> Array2<Real> {
    assert_eq!(values.len(), condensed_len(n), "condensed buffer does not match n = {n}");
    let mut out = Array2::<Real>::zeros((n, n));
    for i in 0..n {
        out[[i, i]] = 1.0;
    }
    let mut offset = 0;
    for i in 0..n {
        for j in i + 1..n {
            let v = values[offset];
            out[[i, j]] = v;
            out[[j, i]] = v;
            offset += 1;
        }
    }
    out
}

/// CorrMatrix — owned condensed correlation result.
///
/// Purpose
/// -------
/// Hold the condensed output of one correlation run together with the
/// number of variables it describes, and offer symmetric lookup and square
/// expansion without the caller redoing index arithmetic.
///
/// Fields
/// ------
/// - `values`: `Vec<Real>`
///   Condensed upper triangle in row-major pair order.
/// - `n_vars`: `usize`
///   Number of variables `N`.
///
/// Invariants
/// ----------
/// - `values.len() == condensed_len(n_vars)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrMatrix {
    values: Vec<Real>,
    n_vars: usize,
}

impl CorrMatrix {
    pub(crate) fn from_parts(values: Vec<Real>, n_vars: usize) -> Self {
        debug_assert_eq!(values.len(), condensed_len(n_vars));
        CorrMatrix { values, n_vars }
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// Condensed values in `(0,1), (0,2), …, (N−2,N−1)` order.
    pub fn as_condensed(&self) -> &[Real] {
        &self.values
    }

    pub fn into_condensed(self) -> Vec<Real> {
        self.values
    }

    /// Association between variables `i` and `j` in either order; the
    /// diagonal is 1.
    ///
    /// Panics
    /// ------
    /// - If `i` or `j` is not below `n_vars`.
    pub fn get(&self, i: usize, j: usize) -> Real {
        assert!(i < self.n_vars && j < self.n_vars, "index ({i}, {j}) out of range");
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => 1.0,
            std::cmp::Ordering::Less => self.values[pair_to_offset(i, j, self.n_vars)],
            std::cmp::Ordering::Greater => self.values[pair_to_offset(j, i, self.n_vars)],
        }
    }

    pub fn to_square(&self) -> Array2<Real> {
        to_square(&self.values, self.n_vars)
    }
}
