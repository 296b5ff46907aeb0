//! Single-producer, single-consumer ring buffer over caller-owned storage.
//!
//! The queue itself stores nothing but two counters (spec.md §3.1): no
//! buffer, no pointer to one. It returns `(index, count)` pairs describing
//! a maximal contiguous run into storage the caller already owns; see
//! [`raw`] for the bare protocol and [`SpscQueue`] for the capacity-fixed,
//! guard-returning convenience layer (grounded in the teacher's
//! `Ring`/`Reservation` split).

use crate::cache::CacheAligned;
use crate::config::RingBits;
use crate::invariants::{debug_assert_bounded_count, debug_assert_monotonic};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A maximal contiguous run `[index, index + count)` available to a
/// producer or consumer.
///
/// `count == 0` means nothing is available right now — there is no other
/// failure mode (spec.md §4.1 "Failure"). If `tail` (or `head`, for a
/// push) has crossed the capacity-sized block boundary relative to the
/// other side, the run is truncated at that boundary; a second call is
/// needed to drain or fill the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub index: usize,
    pub count: usize,
}

impl Span {
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.count == 0
    }
}

/// Bare head/tail protocol operating directly on a pair of atomic
/// counters, with the capacity exponent passed per call.
///
/// This mirrors the original `queue_pop`/`queue_push` C functions, which
/// take `cap_lg2` as an argument rather than storing it alongside `head`
/// and `tail` — useful for callers who manage their own counter pair
/// (e.g. embedding them in a larger struct) instead of going through
/// [`SpscQueue`].
pub mod raw {
    use super::{AtomicUsize, Ordering, Span};

    /// Acquire-loads `tail`, relaxed-loads the caller's own `head`, and
    /// returns the maximal contiguous poppable run.
    ///
    /// `cond` is `1` iff `tail` has crossed into the block after `head`'s
    /// (accounting for wraparound past `usize::MAX` via parity of the
    /// block indices), in which case the run is truncated at the block
    /// boundary; otherwise `cond` is `0` and the full gap is poppable.
    #[inline]
    #[must_use]
    pub fn pop_slice(head: &AtomicUsize, tail: &AtomicUsize, k: u32) -> Span {
        let tail_v = tail.load(Ordering::Acquire);
        let head_v = head.load(Ordering::Relaxed);
        let mask = (1usize << k) - 1;
        let cond = (tail_v >> k).wrapping_sub(head_v >> k) & 1;
        let count = tail_v.wrapping_sub(head_v) - (tail_v & mask) * cond;
        Span { index: head_v & mask, count }
    }

    /// Release-stores `head + n`. The caller must not pass `n` greater
    /// than the `count` of the most recent [`pop_slice`].
    #[inline]
    pub fn commit_pop(head: &AtomicUsize, n: usize) {
        let head_v = head.load(Ordering::Relaxed);
        head.store(head_v.wrapping_add(n), Ordering::Release);
    }

    /// Acquire-loads `head`, relaxed-loads the caller's own `tail`, and
    /// returns the maximal contiguous pushable run, reserving nothing
    /// extra beyond what capacity allows (this is the producer-side
    /// mirror of [`pop_slice`]; see spec.md §4.1).
    #[inline]
    #[must_use]
    pub fn push_slice(head: &AtomicUsize, tail: &AtomicUsize, k: u32) -> Span {
        let head_v = head.load(Ordering::Acquire);
        let tail_v = tail.load(Ordering::Relaxed);
        let mask = (1usize << k) - 1;
        let cond = (tail_v >> k).wrapping_sub(head_v >> k) & 1;
        let count = (mask + 1) - tail_v.wrapping_sub(head_v) - (head_v & mask) * (1 - cond);
        Span { index: tail_v & mask, count }
    }

    /// Release-stores `tail + n`. The caller must not pass `n` greater
    /// than the `count` of the most recent [`push_slice`].
    #[inline]
    pub fn commit_push(tail: &AtomicUsize, n: usize) {
        let tail_v = tail.load(Ordering::Relaxed);
        tail.store(tail_v.wrapping_add(n), Ordering::Release);
    }
}

/// A single-producer single-consumer ring buffer with its capacity fixed
/// at construction.
///
/// Holds only the two counters from spec.md §3.1 — no backing storage.
/// Callers index their own array with the `index`/`count` a [`Span`]
/// returns, or use [`SpscQueue::write_slice`]/[`SpscQueue::read_slice`] to
/// get a borrowed `&mut [T]`/`&[T]` directly.
#[repr(C)]
pub struct SpscQueue {
    tail: CacheAligned<AtomicUsize>,
    head: CacheAligned<AtomicUsize>,
    bits: RingBits,
}

// Safety: only the producer writes `tail`, only the consumer writes
// `head`; each reads the other with Acquire paired against the writer's
// Release. No data lives in `SpscQueue` itself.
unsafe impl Send for SpscQueue {}
unsafe impl Sync for SpscQueue {}

impl SpscQueue {
    /// Creates an empty queue of capacity `2^bits.get()`.
    #[must_use]
    pub const fn new(bits: RingBits) -> Self {
        Self {
            tail: CacheAligned::new(AtomicUsize::new(0)),
            head: CacheAligned::new(AtomicUsize::new(0)),
            bits,
        }
    }

    /// Returns the ring's capacity in elements.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.bits.capacity()
    }

    /// Returns the number of elements currently queued. Racy with respect
    /// to a concurrent producer/consumer; intended for diagnostics.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Relaxed)
    }

    /// Returns the maximal contiguous poppable run.
    #[inline]
    #[must_use]
    pub fn pop_slice(&self) -> Span {
        raw::pop_slice(&self.head, &self.tail, self.bits.get())
    }

    /// Publishes the consumption of `n` elements (`n` must be `<=` the
    /// `count` of the most recent [`SpscQueue::pop_slice`]).
    #[inline]
    pub fn commit_pop(&self, n: usize) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let new_head = head.wrapping_add(n);
        debug_assert!(
            tail.wrapping_sub(new_head) <= self.capacity(),
            "committed past tail"
        );
        debug_assert_monotonic!("head", head, new_head);
        raw::commit_pop(&self.head, n);
    }

    /// Returns the maximal contiguous pushable run.
    #[inline]
    #[must_use]
    pub fn push_slice(&self) -> Span {
        raw::push_slice(&self.head, &self.tail, self.bits.get())
    }

    /// Publishes the production of `n` elements (`n` must be `<=` the
    /// `count` of the most recent [`SpscQueue::push_slice`]).
    #[inline]
    pub fn commit_push(&self, n: usize) {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        let new_tail = tail.wrapping_add(n);
        debug_assert_bounded_count!(new_tail.wrapping_sub(head), self.capacity());
        debug_assert_monotonic!("tail", tail, new_tail);
        raw::commit_push(&self.tail, n);
    }

    /// Borrows the pushable run out of `buf` (the caller's backing
    /// storage) as a live `&mut [T]`, wrapped in a guard that commits on
    /// drop-free consumption — call [`WriteGuard::commit`] or
    /// [`WriteGuard::commit_n`] to publish.
    #[inline]
    pub fn write_slice<'a, T>(&'a self, buf: &'a mut [T]) -> WriteGuard<'a, T> {
        let span = self.push_slice();
        WriteGuard { queue: self, slice: &mut buf[span.index..span.index + span.count] }
    }

    /// Borrows the poppable run out of `buf` as a live `&[T]`, wrapped in
    /// a guard — call [`ReadGuard::commit`] or [`ReadGuard::commit_n`] to
    /// publish how much was actually consumed.
    #[inline]
    pub fn read_slice<'a, T>(&'a self, buf: &'a [T]) -> ReadGuard<'a, T> {
        let span = self.pop_slice();
        ReadGuard { queue: self, slice: &buf[span.index..span.index + span.count] }
    }
}

/// A borrowed writable run plus a commit callback, so callers that
/// already hold `&mut [T]` don't have to redo the index/count arithmetic
/// themselves (spec.md §9 "Slice-then-commit API").
pub struct WriteGuard<'a, T> {
    queue: &'a SpscQueue,
    slice: &'a mut [T],
}

impl<'a, T> WriteGuard<'a, T> {
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.slice
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Commits every element of the borrowed run.
    #[inline]
    pub fn commit(self) {
        let n = self.slice.len();
        self.queue.commit_push(n);
    }

    /// Commits only `n` elements (signals partial completion).
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the borrowed run's length.
    #[inline]
    pub fn commit_n(self, n: usize) {
        assert!(n <= self.slice.len(), "cannot commit more than reserved");
        self.queue.commit_push(n);
    }
}

/// A borrowed readable run plus a commit callback.
pub struct ReadGuard<'a, T> {
    queue: &'a SpscQueue,
    slice: &'a [T],
}

impl<'a, T> ReadGuard<'a, T> {
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        self.slice
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Commits every element of the borrowed run.
    #[inline]
    pub fn commit(self) {
        let n = self.slice.len();
        self.queue.commit_pop(n);
    }

    /// Commits only `n` elements (signals partial completion).
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the borrowed run's length.
    #[inline]
    pub fn commit_n(self, n: usize) {
        assert!(n <= self.slice.len(), "cannot commit more than reserved");
        self.queue.commit_pop(n);
    }
}
