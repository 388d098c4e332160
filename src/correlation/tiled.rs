//! correlation::tiled — square-tile blocking of the pair space.
//!
//! Purpose
//! -------
//! Evaluate pairs tile by tile so that the prepared series of two small
//! groups of variables stay in fast memory while all of their cross pairs
//! are computed. Each series of length `T` is read `N − 1` times over a
//! full run; tiling turns most of those reads into cache hits.
//!
//! Key behaviors
//! -------------
//! - The variable range `[0, N)` is cut into blocks of `tile` variables.
//!   Block pairs `(Bi, Bj)` with `Bi ≤ Bj` are visited in row-major order,
//!   and inside each block pair every `(i, j)` with `i ∈ Bi`, `j ∈ Bj`,
//!   `i < j` is evaluated.
//! - Work is restricted to an offset window of the condensed buffer: only
//!   block rows intersecting the window's rows are visited, and each row's
//!   column span is clipped to the window. This is what lets every worker
//!   of the partitioner tile its own slice independently.
//! - [`suggest_tile`] picks a tile size that keeps two tiles within a
//!   nominal second-level cache budget.
//!
//! Invariants & assumptions
//! ------------------------
//! - Any positive tile size produces exactly the values of the sequential
//!   sweep; tile size only changes the visiting order.
//!
//! Testing notes
//! -------------
//! - Unit tests compare tiled output against the sequential sweep for tile
//!   sizes that divide `N`, that do not, that exceed `N`, and over
//!   sub-windows.

use crate::{
    correlation::{
        condensed::rows_in_window,
        kernel::{fill_block, PairKernel},
    },
    numerics::Real,
};
use std::ops::Range;

/// Nominal fast-memory budget that two tiles of prepared data should fit.
pub const TILE_CACHE_BYTES: usize = 256 * 1024;

/// Tile size keeping two tiles of `bytes_per_var` each within
/// [`TILE_CACHE_BYTES`]; at least 1.
pub fn suggest_tile(bytes_per_var: usize) -> usize {
    (TILE_CACHE_BYTES / (2 * bytes_per_var.max(1))).max(1)
}

/// Tiled sweep over every pair of `window`.
///
/// Parameters
/// ----------
/// - `kernel`: prepared statistics implementing [`PairKernel`].
/// - `tile`: `usize`
///   Variables per tile side; 0 is treated as 1.
/// - `window`: `Range<usize>`
///   Offsets to compute.
/// - `out`: `&mut [Real]`
///   Window-relative output, `out.len() == window.len()`.
pub fn tiled<K: PairKernel + ?Sized>(
    kernel: &K, tile: usize, window: Range<usize>, out: &mut [Real],
) {
    debug_assert_eq!(out.len(), window.len());
    let n = kernel.n_vars();
    let rows = rows_in_window(&window, n);
    if rows.is_empty() {
        return;
    }
    let tile = tile.max(1);

    let first_block = rows.start / tile * tile;
    for bi in (first_block..rows.end).step_by(tile) {
        let block_rows = bi.max(rows.start)..(bi + tile).min(rows.end);
        for bj in (bi..n).step_by(tile) {
            let block_cols = bj..(bj + tile).min(n);
            fill_block(kernel, block_rows.clone(), block_cols, &window, out);
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
    // - Agreement of tiled and sequential sweeps for several tile sizes.
    // - Tiled sweeps restricted to sub-windows.
    // - `suggest_tile` bounds.
    // -------------------------------------------------------------------------

    fn sample(n_obs: usize, n_vars: usize) -> Array2<Real> {
        Array2::from_shape_fn((n_obs, n_vars), |(t, v)| {
            let x = (t as Real + 1.0) * (v as Real + 2.0);
            (x * 0.37).sin() + ((t * 7 + v * 3) % 5) as Real
        })
    }

    #[test]
    // Purpose
    // -------
    // Verify that tiling never changes the output, whatever the tile size.
    //
    // Given
    // -----
    // - N = 13, T = 20; tile sizes 1, 3, 4, 13, 50.
    //
    // Expect
    // ------
    // - Tiled output identical to the sequential sweep for both algorithms.
    fn tiled_matches_sequential_for_all_tile_sizes() {
        // Arrange
        let data = sample(20, 13);
        let pearson = Standardized::prepare(data.view()).expect("prepare should succeed");
        let tetra = Binarized::prepare(data.view()).expect("prepare should succeed");
        let total = condensed_len(13);
        let mut expected_p = vec![0.0; total];
        let mut expected_t = vec![0.0; total];
        sequential(&pearson, 0..total, &mut expected_p);
        sequential(&tetra, 0..total, &mut expected_t);

        for tile in [1, 3, 4, 13, 50] {
            // Act
            let mut got_p = vec![Real::NAN; total];
            let mut got_t = vec![Real::NAN; total];
            tiled(&pearson, tile, 0..total, &mut got_p);
            tiled(&tetra, tile, 0..total, &mut got_t);

            // Assert
            assert_eq!(got_p, expected_p, "pearson, tile = {tile}");
            assert_eq!(got_t, expected_t, "tetrachoric, tile = {tile}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that a window starting and ending mid-row and mid-tile is
    // filled completely and correctly.
    //
    // Given
    // -----
    // - N = 11, tile = 4, windows [0, 7), [7, 30), [30, 55).
    //
    // Expect
    // ------
    // - Each window output equals the matching slice of the full sweep and
    //   contains no untouched (NaN) slots.
    fn tiled_windows_partition_full_output() {
        // Arrange
        let data = sample(16, 11);
        let kernel = Standardized::prepare(data.view()).expect("prepare should succeed");
        let total = condensed_len(11);
        let mut full = vec![0.0; total];
        sequential(&kernel, 0..total, &mut full);

        for window in [0..7, 7..30, 30..total] {
            // Act
            let mut part = vec![Real::NAN; window.len()];
            tiled(&kernel, 4, window.clone(), &mut part);

            // Assert
            assert!(part.iter().all(|v| !v.is_nan()), "window {window:?} left gaps");
            assert_eq!(&full[window.clone()], &part[..], "window {window:?}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that `suggest_tile` stays positive and shrinks with footprint.
    //
    // Given
    // -----
    // - Footprints of 0 bytes, 8 KiB, and 1 MiB per variable.
    //
    // Expect
    // ------
    // - A large tile, 16, and 1 respectively.
    fn suggest_tile_scales_with_footprint() {
        assert!(suggest_tile(0) > 1);
        assert_eq!(suggest_tile(8 * 1024), 16);
        assert_eq!(suggest_tile(1024 * 1024), 1);
    }
}
