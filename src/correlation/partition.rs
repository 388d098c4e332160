//! correlation::partition — fork-join scheduling over disjoint output slices.
//!
//! Purpose
//! -------
//! Run a window-level kernel on a fixed number of worker threads, giving
//! every worker its own contiguous range of condensed offsets and the
//! matching exclusive sub-slice of the output buffer.
//!
//! Key behaviors
//! -------------
//! - [`split_ranges`] cuts `[0, total)` into at most `k` contiguous,
//!   non-empty ranges whose lengths differ by at most one. Because the
//!   condensed layout is row-major, each range is a predictable run of
//!   whole and partial rows.
//! - [`run_threaded`] builds a rayon pool for this call only, hands each
//!   range and its `&mut` sub-slice to one task inside `pool.scope`, and
//!   returns after the scope joins every task. The pool is dropped on
//!   return; nothing persists across calls.
//!
//! Invariants & assumptions
//! ------------------------
//! - Output sub-slices come from `split_at_mut`, so no two tasks can alias
//!   a slot and no locking is needed.
//! - The kernel closure only reads shared state (`Fn + Sync`).
//! - Any positive `k` is accepted. The number of ranges is capped at the
//!   number of offsets, and the pool at the hardware parallelism; surplus
//!   ranges queue on the pool's workers. Results never depend on `k`.
//!
//! Testing notes
//! -------------
//! - Unit tests check range balance and coverage, oversized worker counts,
//!   and that every slot is written by exactly one task.

use crate::{correlation::errors::CorrResult, numerics::Real};
use std::ops::Range;

/// Split `[0, total)` into `min(parts, total)` contiguous, non-empty ranges
/// of near-equal length.
///
/// The first `total % parts` ranges are one element longer. `total = 0`
/// yields no ranges; `parts = 0` is treated as 1.
pub fn split_ranges(total: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, total.max(1));
    if total == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let extra = total % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for p in 0..parts {
        let len = base + usize::from(p < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Run `work` over `out` on `threads` workers and wait for all of them.
///
/// Parameters
/// ----------
/// - `threads`: `usize`
///   Requested worker count; must be positive (validated by the
///   dispatcher). Values beyond the number of offsets or the hardware
///   parallelism are accepted and capped.
/// - `out`: `&mut [Real]`
///   Full condensed output buffer; offset `k` is `out[k]`.
/// - `work`: `Fn(Range<usize>, &mut [Real]) + Sync`
///   Window-level kernel; receives an offset range and the sub-slice that
///   holds exactly those offsets.
///
/// Errors
/// ------
/// - `CorrError::ThreadPool`
///   When the per-call rayon pool cannot be built.
pub fn run_threaded<F>(threads: usize, out: &mut [Real], work: F) -> CorrResult<()>
where
    F: Fn(Range<usize>, &mut [Real]) + Sync,
{
    let ranges = split_ranges(out.len(), threads);
    if ranges.is_empty() {
        return Ok(());
    }
    let hardware = std::thread::available_parallelism().map_or(1, |n| n.get());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ranges.len().min(hardware))
        .thread_name(|i| format!("corrmat-worker-{i}"))
        .build()?;

    let work = &work;
    pool.scope(|scope| {
        // Ranges are back to back from offset 0.
        let mut rest: &mut [Real] = out;
        for range in ranges {
            let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
            rest = tail;
            scope.spawn(move |_| work(range, chunk));
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Balance and coverage of `split_ranges`.
    // - Exactly-once writes under `run_threaded`, including surplus workers.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that ranges are contiguous, cover the whole span, and differ in
    // length by at most one.
    //
    // Given
    // -----
    // - total ∈ {1, 10, 101}, parts ∈ {1, 3, 7, 200, usize::MAX}.
    //
    // Expect
    // ------
    // - min(parts, total) non-empty ranges, back to back from 0 to total,
    //   balanced.
    fn split_ranges_is_contiguous_and_balanced() {
        for total in [1, 10, 101] {
            for parts in [1, 3, 7, 200, usize::MAX] {
                // Act
                let ranges = split_ranges(total, parts);

                // Assert
                assert_eq!(ranges.len(), parts.min(total));
                assert!(ranges.iter().all(|r| !r.is_empty()));
                assert_eq!(ranges.first().map(|r| r.start), Some(0));
                assert_eq!(ranges.last().map(|r| r.end), Some(total));
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
                let max = ranges.iter().map(|r| r.len()).max().unwrap_or(0);
                let min = ranges.iter().map(|r| r.len()).min().unwrap_or(0);
                assert!(max - min <= 1, "total = {total}, parts = {parts}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure every output slot is written exactly once and receives the
    // value for its own offset, with more workers than slots.
    //
    // Given
    // -----
    // - A 37-slot buffer and thread counts 1, 4, 37, 64, 2^40, usize::MAX.
    //
    // Expect
    // ------
    // - out[k] == k for all k and one recorded write per slot.
    fn run_threaded_writes_each_slot_once() {
        for threads in [1, 4, 37, 64, 1 << 40, usize::MAX] {
            // Arrange
            let writes: Vec<AtomicUsize> = (0..37).map(|_| AtomicUsize::new(0)).collect();
            let mut out = vec![Real::NAN; 37];

            // Act
            run_threaded(threads, &mut out, |range, chunk| {
                assert_eq!(range.len(), chunk.len());
                for (slot, offset) in chunk.iter_mut().zip(range) {
                    writes[offset].fetch_add(1, Ordering::Relaxed);
                    *slot = offset as Real;
                }
            })
            .expect("pool should build");

            // Assert
            for (k, v) in out.iter().enumerate() {
                assert_eq!(*v, k as Real, "threads = {threads}");
                assert_eq!(writes[k].load(Ordering::Relaxed), 1, "threads = {threads}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify that an empty output is a no-op.
    //
    // Given
    // -----
    // - A zero-length buffer and 8 threads.
    //
    // Expect
    // ------
    // - Ok(()) without invoking the work closure, and no ranges at all.
    fn run_threaded_empty_output_is_noop() {
        let mut out: Vec<Real> = Vec::new();
        let result = run_threaded(8, &mut out, |_, _| panic!("no work expected"));
        assert!(result.is_ok());
        assert!(split_ranges(0, 8).is_empty());
    }
}
