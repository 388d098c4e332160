//! correlation::stats — per-variable statistics prepared once per run.
//!
//! Purpose
//! -------
//! Turn the caller's `T×N` time-series matrix into the per-variable working
//! representation each association measure needs, so that every pair can
//! afterwards be evaluated from contiguous, read-only buffers:
//!
//! - [`Standardized`] (Pearson): each series centered and scaled to unit
//!   Euclidean norm, `z = (x − mean) / ‖x − mean‖`, so that a Pearson
//!   coefficient is a plain dot product `⟨z_i, z_j⟩`.
//! - [`Binarized`] (tetrachoric): each series split at its median into two
//!   states and packed into `u64` words, plus the number of upper states,
//!   so that a 2×2 contingency table is a single AND + popcount sweep.
//!
//! Key behaviors
//! -------------
//! - Each column is scaled by its largest magnitude before centering, and
//!   the sums of squared deviations use a two-pass scheme with `f64`
//!   accumulators regardless of [`Real`]. This avoids both the catastrophic
//!   cancellation of the one-pass `Σx² − (Σx)²/T` form and overflow or
//!   underflow for finite data of extreme magnitude.
//! - A series whose values are all identical is flagged constant and stored
//!   as all zeros, which makes every Pearson coefficient involving it
//!   exactly 0. No other condition produces that sentinel.
//! - Samples tied with the median are assigned to whichever state keeps
//!   both states populated, so 0/1 series survive binarization unchanged.
//! - Working storage is reserved with `try_reserve_exact`; failure surfaces
//!   as [`CorrError::ScratchAllocation`] instead of aborting.
//!
//! Invariants & assumptions
//! ------------------------
//! - Input shape is `(T, N)`: rows are time points, columns are variables.
//!   Any memory layout is accepted; columns are copied into a
//!   variable-major buffer (each series contiguous).
//! - The prepared buffers are immutable after construction and shared by
//!   reference across worker threads.
//! - Non-finite samples are not rejected. In the Pearson path they make the
//!   affected coefficients NaN; in the tetrachoric path NaN never compares
//!   above the median and counts as a lower state.
//!
//! Testing notes
//! -------------
//! - Unit tests check the standardization invariants (zero mean, unit norm),
//!   the constant-series path, extreme magnitudes, median splits for
//!   odd/even T and for tied 0/1 series, and bit packing across word
//!   boundaries.

use crate::{
    correlation::errors::{CorrError, CorrResult},
    numerics::Real,
};
use ndarray::ArrayView2;

/// Reserve exactly `len` elements or report how many bytes were requested.
pub(crate) fn try_buffer<T>(len: usize) -> CorrResult<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| CorrError::ScratchAllocation {
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(buf)
}

/// Standardized — unit-norm centered series for Pearson correlation.
///
/// Fields
/// ------
/// - `z`: `Vec<Real>`
///   Variable-major buffer of length `N·T`; series `v` occupies
///   `z[v·T .. (v+1)·T]`.
/// - `constant`: `Vec<bool>`
///   Whether each variable repeats a single value.
///
/// Invariants
/// ----------
/// - For every variable, `z` is either all zeros (constant series) or has
///   mean ≈ 0 and Euclidean norm ≈ 1.
#[derive(Debug, Clone)]
pub struct Standardized {
    z: Vec<Real>,
    constant: Vec<bool>,
    n_vars: usize,
    n_obs: usize,
}

impl Standardized {
    /// Standardize every column of a `(T, N)` matrix.
    ///
    /// Each column is first divided by its largest magnitude, so neither the
    /// centering nor the squared deviations can overflow or underflow for
    /// finite input of any scale.
    ///
    /// Errors
    /// ------
    /// - `CorrError::ScratchAllocation`
    ///   When the `N·T` working buffer cannot be reserved.
    pub fn prepare(data: ArrayView2<'_, Real>) -> CorrResult<Self> {
        let (n_obs, n_vars) = data.dim();
        let mut z: Vec<Real> = try_buffer(n_vars.saturating_mul(n_obs))?;
        let mut constant: Vec<bool> = try_buffer(n_vars)?;

        for col in data.columns() {
            let first = col.first().copied();
            // Exact test: a constant series with an unrepresentable mean would
            // otherwise leave rounding residue after centering.
            if col.iter().all(|&x| Some(x) == first) {
                z.resize(z.len() + n_obs, 0.0);
                constant.push(true);
                continue;
            }

            let scale = col.iter().fold(0.0_f64, |m, &x| m.max(f64::from(x).abs()));
            let mean = col.iter().map(|&x| f64::from(x) / scale).sum::<f64>() / n_obs as f64;
            let ss: f64 = col
                .iter()
                .map(|&x| {
                    let d = f64::from(x) / scale - mean;
                    d * d
                })
                .sum();
            let inv_norm = 1.0 / ss.sqrt();

            z.extend(col.iter().map(|&x| ((f64::from(x) / scale - mean) * inv_norm) as Real));
            constant.push(false);
        }

        Ok(Standardized { z, constant, n_vars, n_obs })
    }

    /// Standardized series of variable `v`.
    #[inline]
    pub fn series(&self, v: usize) -> &[Real] {
        &self.z[v * self.n_obs..(v + 1) * self.n_obs]
    }

    /// True when variable `v` has zero variance.
    #[inline]
    pub fn is_constant(&self, v: usize) -> bool {
        self.constant[v]
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }
}

/// Binarized — median-split, bit-packed series for tetrachoric correlation.
///
/// Fields
/// ------
/// - `bits`: `Vec<u64>`
///   Variable-major packed states; variable `v` occupies
///   `bits[v·W .. (v+1)·W]` with `W = ⌈T/64⌉`. Bit `t % 64` of word
///   `t / 64` is set when sample `t` is in the upper state (see
///   [`Binarized::prepare`]). Padding bits in the last word are zero.
/// - `ones`: `Vec<u64>`
///   Number of upper states per variable.
///
/// Invariants
/// ----------
/// - `ones[v] == popcount(bits of v)` and `0 ≤ ones[v] ≤ T`.
#[derive(Debug, Clone)]
pub struct Binarized {
    bits: Vec<u64>,
    ones: Vec<u64>,
    words: usize,
    n_vars: usize,
    n_obs: usize,
}

impl Binarized {
    /// Split every column of a `(T, N)` matrix at its median.
    ///
    /// Samples strictly above the median are the upper state. Samples equal
    /// to the median join the upper state instead when that is the only way
    /// to keep both states non-empty, or when it balances the two states
    /// more evenly; this keeps already-dichotomous input (0/1 series with a
    /// majority of ones) intact.
    ///
    /// Errors
    /// ------
    /// - `CorrError::ScratchAllocation`
    ///   When the packed buffer or the per-column sort scratch cannot be
    ///   reserved.
    pub fn prepare(data: ArrayView2<'_, Real>) -> CorrResult<Self> {
        let (n_obs, n_vars) = data.dim();
        let words = n_obs.div_ceil(64);
        let mut bits: Vec<u64> = try_buffer(n_vars.saturating_mul(words))?;
        let mut ones: Vec<u64> = try_buffer(n_vars)?;
        let mut sorted: Vec<Real> = try_buffer(n_obs)?;

        for col in data.columns() {
            sorted.clear();
            sorted.extend(col.iter().copied());
            let median = median_in_place(&mut sorted);
            let above = col.iter().filter(|&&x| x > median).count();
            let at_or_above = col.iter().filter(|&&x| x >= median).count();
            let inclusive = prefer_inclusive(above, at_or_above, n_obs);

            let start = bits.len();
            bits.resize(start + words, 0);
            let packed = &mut bits[start..];
            let mut count = 0u64;
            for (t, &x) in col.iter().enumerate() {
                if x > median || (inclusive && x == median) {
                    packed[t / 64] |= 1u64 << (t % 64);
                    count += 1;
                }
            }
            ones.push(count);
        }

        Ok(Binarized { bits, ones, words, n_vars, n_obs })
    }

    /// Packed states of variable `v`.
    #[inline]
    pub fn words(&self, v: usize) -> &[u64] {
        &self.bits[v * self.words..(v + 1) * self.words]
    }

    /// Number of samples of variable `v` in the upper state.
    #[inline]
    pub fn ones(&self, v: usize) -> u64 {
        self.ones[v]
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }
}

/// Median of `values`, sorting them in place (mean of the two middle values
/// for even length; 0 for an empty slice).
fn median_in_place(values: &mut [Real]) -> Real {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    if len % 2 == 1 {
        values[len / 2]
    } else {
        let lo = values[len / 2 - 1];
        let hi = values[len / 2];
        lo + (hi - lo) / 2.0
    }
}

/// Whether ties at the median should join the upper state, given the upper
/// counts of the strict (`above`) and inclusive (`at_or_above`) splits.
fn prefer_inclusive(above: usize, at_or_above: usize, n_obs: usize) -> bool {
    let splits = |k: usize| k > 0 && k < n_obs;
    let imbalance = |k: usize| (2 * k).abs_diff(n_obs);
    match (splits(above), splits(at_or_above)) {
        (false, true) => true,
        (true, true) => imbalance(at_or_above) < imbalance(above),
        _ => false,
    }
}
