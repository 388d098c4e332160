//! correlation::oblivious — cache-oblivious recursive blocking.
//!
//! Purpose
//! -------
//! Evaluate the pair triangle by recursive bisection so that, at every
//! level of the memory hierarchy, some level of the recursion produces
//! sub-problems whose prepared data fits, without a tuned tile size.
//!
//! Key behaviors
//! -------------
//! - A *diagonal* block `[lo, hi) × [lo, hi)` (pairs `i < j` both inside)
//!   splits at its midpoint `m` into three sub-problems: the diagonal
//!   blocks `[lo, m)` and `[m, hi)`, and the full rectangle
//!   `[lo, m) × [m, hi)` between them.
//! - A *rectangular* block `rows × cols` (every row below every column)
//!   splits the longer of its two ranges at the midpoint into two.
//! - A block whose combined span `|rows| + |cols|` is at most the leaf span
//!   is evaluated directly with the sequential pair loop.
//! - Blocks whose rows miss the offset window are pruned, so each worker of
//!   the partitioner recurses only over its own slice.
//!
//! Invariants & assumptions
//! ------------------------
//! - The leaf span is at least 4, so recursion terminates: a block of span
//!   2 holds at most one pair.
//! - Output values are identical to the sequential sweep; only the
//!   visiting order differs.
//!
//! Conventions
//! -----------
//! - `min_tile = 0` derives the leaf span from [`LEAF_CACHE_BYTES`] and the
//!   kernel's per-variable footprint; a positive `min_tile` fixes the leaf
//!   to two ranges of `min_tile` variables.
//!
//! Testing notes
//! -------------
//! - Unit tests compare against the sequential sweep for several `N`,
//!   forced small leaves, and sub-windows.

use crate::{
    correlation::{
        condensed::rows_in_window,
        kernel::{fill_block, PairKernel},
    },
    numerics::Real,
};
use std::ops::Range;

/// Implicit fast-memory budget for one leaf's prepared data.
pub const LEAF_CACHE_BYTES: usize = 32 * 1024;

const MIN_LEAF_SPAN: usize = 4;

/// Combined row+column span at or below which a block is a leaf.
pub fn leaf_span(bytes_per_var: usize, min_tile: usize) -> usize {
    let span = if min_tile > 0 {
        min_tile.saturating_mul(2)
    } else {
        LEAF_CACHE_BYTES / bytes_per_var.max(1)
    };
    span.max(MIN_LEAF_SPAN)
}

/// Cache-oblivious sweep over every pair of `window`.
pub fn cache_oblivious<K: PairKernel + ?Sized>(
    kernel: &K, min_tile: usize, window: Range<usize>, out: &mut [Real],
) {
    debug_assert_eq!(out.len(), window.len());
    let n = kernel.n_vars();
    let rows = rows_in_window(&window, n);
    if rows.is_empty() {
        return;
    }
    let mut walker = Walker {
        kernel,
        leaf_span: leaf_span(kernel.bytes_per_var(), min_tile),
        rows,
        window,
        out,
    };
    walker.diagonal(0..n);
}

struct Walker<'a, K: PairKernel + ?Sized> {
    kernel: &'a K,
    leaf_span: usize,
    rows: Range<usize>,
    window: Range<usize>,
    out: &'a mut [Real],
}

impl<K: PairKernel + ?Sized> Walker<'_, K> {
    fn touches_window(&self, rows: &Range<usize>) -> bool {
        rows.start < self.rows.end && self.rows.start < rows.end
    }

    fn leaf(&mut self, rows: Range<usize>, cols: Range<usize>) {
        let rows = rows.start.max(self.rows.start)..rows.end.min(self.rows.end);
        fill_block(self.kernel, rows, cols, &self.window, self.out);
    }

    /// Pairs `i < j` with both indices in `span`.
    fn diagonal(&mut self, span: Range<usize>) {
        if span.len() < 2 || !self.touches_window(&span) {
            return;
        }
        if 2 * span.len() <= self.leaf_span {
            self.leaf(span.clone(), span);
            return;
        }
        let mid = span.start + span.len() / 2;
        self.diagonal(span.start..mid);
        self.rectangle(span.start..mid, mid..span.end);
        self.diagonal(mid..span.end);
    }

    /// Every pair with `i ∈ rows`, `j ∈ cols`, where all rows precede all cols.
    fn rectangle(&mut self, rows: Range<usize>, cols: Range<usize>) {
        if rows.is_empty() || cols.is_empty() || !self.touches_window(&rows) {
            return;
        }
        if rows.len() + cols.len() <= self.leaf_span {
            self.leaf(rows, cols);
            return;
        }
        if rows.len() >= cols.len() {
            let mid = rows.start + rows.len() / 2;
            self.rectangle(rows.start..mid, cols.clone());
            self.rectangle(mid..rows.end, cols);
        } else {
            let mid = cols.start + cols.len() / 2;
            self.rectangle(rows.clone(), cols.start..mid);
            self.rectangle(rows, mid..cols.end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{
        condensed::condensed_len,
        kernel::sequential,
        stats::{Binarized, Standardized},
    };
    use ndarray::Array2;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement with the sequential sweep for automatic and forced leaf
    //   sizes, across odd and even N.
    // - Windowed recursion.
    // - `leaf_span` lower bound.
    // -------------------------------------------------------------------------

    fn sample(n_obs: usize, n_vars: usize) -> Array2<Real> {
        Array2::from_shape_fn((n_obs, n_vars), |(t, v)| {
            ((t * (v + 3)) % 7) as Real + (v as Real * 0.11 + t as Real * 0.05).cos()
        })
    }

    #[test]
    // Purpose
    // -------
    // Verify that recursion reproduces the sequential sweep exactly.
    //
    // Given
    // -----
    // - N ∈ {2, 3, 17, 40}, T = 24; min_tile ∈ {0, 1, 2, 5}.
    //
    // Expect
    // ------
    // - Identical condensed output for both algorithms.
    fn cache_oblivious_matches_sequential() {
        for n in [2, 3, 17, 40] {
            // Arrange
            let data = sample(24, n);
            let pearson = Standardized::prepare(data.view()).expect("prepare should succeed");
            let tetra = Binarized::prepare(data.view()).expect("prepare should succeed");
            let total = condensed_len(n);
            let mut expected_p = vec![0.0; total];
            let mut expected_t = vec![0.0; total];
            sequential(&pearson, 0..total, &mut expected_p);
            sequential(&tetra, 0..total, &mut expected_t);

            for min_tile in [0, 1, 2, 5] {
                // Act
                let mut got_p = vec![Real::NAN; total];
                let mut got_t = vec![Real::NAN; total];
                cache_oblivious(&pearson, min_tile, 0..total, &mut got_p);
                cache_oblivious(&tetra, min_tile, 0..total, &mut got_t);

                // Assert
                assert_eq!(got_p, expected_p, "pearson, n = {n}, min_tile = {min_tile}");
                assert_eq!(got_t, expected_t, "tetrachoric, n = {n}, min_tile = {min_tile}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that windowed recursion fills exactly its slice.
    //
    // Given
    // -----
    // - N = 23 with min_tile = 1 (deep recursion) and three windows that
    //   split rows mid-way.
    //
    // Expect
    // ------
    // - Each window matches the full sweep with no untouched slots.
    fn cache_oblivious_windows_match_full_sweep() {
        // Arrange
        let data = sample(10, 23);
        let kernel = Standardized::prepare(data.view()).expect("prepare should succeed");
        let total = condensed_len(23);
        let mut full = vec![0.0; total];
        sequential(&kernel, 0..total, &mut full);

        for window in [0..50, 50..200, 200..total] {
            // Act
            let mut part = vec![Real::NAN; window.len()];
            cache_oblivious(&kernel, 1, window.clone(), &mut part);

            // Assert
            assert!(part.iter().all(|v| !v.is_nan()), "window {window:?} left gaps");
            assert_eq!(&full[window.clone()], &part[..], "window {window:?}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the leaf-span derivation and its lower bound.
    //
    // Given
    // -----
    // - Footprints of 8 bytes and 1 MiB with automatic leaves; min_tile = 6.
    //
    // Expect
    // ------
    // - 4096, the floor 4, and 12.
    fn leaf_span_respects_budget_and_floor() {
        assert_eq!(leaf_span(8, 0), 4096);
        assert_eq!(leaf_span(1024 * 1024, 0), MIN_LEAF_SPAN);
        assert_eq!(leaf_span(8, 6), 12);
    }
}
