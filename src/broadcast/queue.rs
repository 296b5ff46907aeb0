//! Single-writer, multi-reader broadcast ring buffer.
//!
//! Unlike the SPSC queue (spec.md §3.1), data here is never consumed —
//! every attached reader sees every element the writer publishes, and a
//! slot is only reused once all currently-attached readers have advanced
//! past it. `head` is therefore derived from the packed state word
//! rather than stored (spec.md §3.2), and readers track their own
//! position independently.

use super::state::{self, derive_head, AtomicRaw, Raw, ReaderRaw, State};
use crate::cache::CacheAligned;
use crate::config::BroadcastBits;
use crate::error::AttachError;
use std::sync::atomic::Ordering;

/// A (possibly two-segment) contiguous view, analogous to [`crate::spsc::Span`]
/// but able to describe a run that wraps past the end of the caller's
/// buffer in one shot (spec.md §3.2 "Slice shape").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span2 {
    idx0: usize,
    cnt0: usize,
    cnt1: usize,
    len: usize,
}

impl Span2 {
    /// Start index of the first segment.
    #[inline]
    #[must_use]
    pub const fn idx0(&self) -> usize {
        self.idx0
    }

    /// Length of the first segment.
    #[inline]
    #[must_use]
    pub const fn cnt0(&self) -> usize {
        self.cnt0
    }

    /// Start index of the second segment, when present. Always `0`: a
    /// wraparound segment always begins at the start of the caller's
    /// buffer.
    #[inline]
    #[must_use]
    pub const fn idx1(&self) -> usize {
        0
    }

    /// Length of the second (wraparound) segment; `0` if the run doesn't
    /// wrap.
    #[inline]
    #[must_use]
    pub const fn cnt1(&self) -> usize {
        self.cnt1
    }

    /// Total elements described by both segments.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bare protocol operating directly on a packed state word, with the
/// capacity exponent passed per call — mirrors the original C functions'
/// signature shape (`brdct_attach_reader(Broadcast *, unsigned char
/// caplg2, Reader *)` and friends), for callers assembling their own
/// wrapper instead of going through [`BroadcastQueue`].
pub mod raw {
    use super::{
        derive_head, state, AtomicRaw, AttachError, Ordering, Raw, ReaderRaw, Span2, State,
    };
    use crate::invariants::{
        debug_assert_census_bounded, debug_assert_hstate_consistent,
        debug_assert_reader_in_bounds,
    };

    /// Increments the reader census and returns the new reader's starting
    /// position (the current derived `head`).
    pub fn attach_reader(word: &AtomicRaw, k: u32) -> Result<ReaderRaw, AttachError> {
        match word.fetch_update(Ordering::AcqRel, Ordering::Relaxed, |raw| {
            let curr = State::decode(raw);
            if curr.nreaders == state::MAX_READERS {
                return None;
            }
            let mut new = curr;
            new.nreaders += 1;
            Some(new.encode())
        }) {
            Ok(raw) => {
                let new = State::decode(raw);
                debug_assert_census_bounded!(new.ncycled, new.nreaders);
                let head = derive_head(new.tail, new.hstate, k);
                log::trace!("broadcast reader attached at head {head}");
                Ok(head as ReaderRaw)
            }
            Err(raw) => {
                let curr = State::decode(raw);
                log::trace!(
                    "broadcast reader attach rejected: census at {} readers",
                    curr.nreaders
                );
                Err(AttachError::TooManyReaders { max: state::MAX_READERS as usize })
            }
        }
    }

    /// Decrements the reader census, folding the departing reader's
    /// half-block progress out of `ncycled` if it hadn't cycled yet.
    pub fn detach_reader(word: &AtomicRaw, k: u32, reader: ReaderRaw) {
        let r_ext = Raw::from(reader);
        let raw = word
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |raw| {
                let curr = State::decode(raw);
                let mut new = curr;
                new.nreaders -= 1;
                if new.hstate != 0 && (new.tail >> (k - 1)) == (r_ext >> (k - 1)) {
                    new.ncycled -= 1;
                }
                Some(new.encode())
            })
            .expect("fetch_update with an always-Some closure cannot fail");
        let new = State::decode(raw);
        debug_assert_census_bounded!(new.ncycled, new.nreaders);
        log::trace!("broadcast reader detached, {} remaining", new.nreaders);
    }

    /// Returns the maximal contiguous (possibly two-segment) run between
    /// `reader` and the current `tail`.
    pub fn reader_slice(word: &AtomicRaw, k: u32, reader: ReaderRaw, capacity: usize) -> Span2 {
        let raw = word.load(Ordering::Acquire);
        let curr = State::decode(raw);
        let mask: Raw = (1 << k) - 1;
        let r = Raw::from(reader);

        debug_assert_reader_in_bounds!(curr.tail.wrapping_sub(r), capacity as Raw);

        let idx0 = (r & mask) as usize;
        let mut cnt0 = curr.tail.wrapping_sub(r);
        let mut cnt1: Raw = 0;
        if (curr.tail >> k) != (r >> k) {
            cnt0 -= curr.tail & mask;
            cnt1 = curr.tail & mask;
        }
        Span2 { idx0, cnt0: cnt0 as usize, cnt1: cnt1 as usize, len: (cnt0 + cnt1) as usize }
    }

    /// Advances `reader` by `consumed` elements, returning its new
    /// position, and folds a half-block crossing into the shared reader
    /// census if one occurred.
    pub fn reader_commit(word: &AtomicRaw, k: u32, reader: ReaderRaw, consumed: usize) -> ReaderRaw {
        let prev_ext = Raw::from(reader);
        let new_ext = prev_ext.wrapping_add(consumed as Raw);
        let new_reader = new_ext as ReaderRaw;

        if (new_ext >> (k - 1)) == (prev_ext >> (k - 1)) {
            return new_reader;
        }

        let raw = word
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |raw| {
                let mut new = State::decode(raw);
                new.ncycled += 1;
                Some(new.encode())
            })
            .expect("fetch_update with an always-Some closure cannot fail");
        let new = State::decode(raw);
        debug_assert_census_bounded!(new.ncycled, new.nreaders);
        new_reader
    }

    /// Returns the maximal contiguous (possibly two-segment) run the
    /// writer may publish into right now, resetting the reader census as
    /// a side effect if every attached reader has caught up.
    ///
    /// If `nreaders == 0`, or some reader hasn't caught up yet
    /// (`ncycled < nreaders`), the state word is left exactly as it was —
    /// there is no unconditional reset for the zero-readers case.
    pub fn writer_slice(word: &AtomicRaw, k: u32) -> Span2 {
        let result = word.fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            let curr = State::decode(raw);
            if curr.nreaders == 0 || curr.ncycled < curr.nreaders {
                return None;
            }
            let mut new = curr;
            new.ncycled = 0;
            new.hstate = 0;
            Some(new.encode())
        });
        let raw = match result {
            Ok(raw) | Err(raw) => raw,
        };
        let new = State::decode(raw);
        debug_assert_hstate_consistent!(new.hstate, new.ncycled);

        let head = derive_head(new.tail, new.hstate, k);
        let mask: Raw = (1 << k) - 1;
        let idx0 = (new.tail & mask) as usize;
        let mut cnt0 = (mask + 1) - new.tail.wrapping_sub(head);
        let mut cnt1: Raw = 0;
        if (new.tail >> k) == (head >> k) {
            cnt0 -= head & mask;
            cnt1 = head & mask;
        }
        let mut len = cnt0 + cnt1;

        // Never let the writer fill the last open slot: a full ring
        // (tail - head == capacity) is indistinguishable from empty in
        // the disambiguation scheme the readers rely on.
        if new.tail.wrapping_add(len).wrapping_sub(head) == (1 << k) {
            len -= 1;
            if cnt1 > 0 {
                cnt1 -= 1;
            } else if cnt0 > 0 {
                cnt0 -= 1;
            }
        }

        Span2 { idx0, cnt0: cnt0 as usize, cnt1: cnt1 as usize, len: len as usize }
    }

    /// Publishes `written` elements, advancing `tail` and marking
    /// `hstate` if that crossed into the next half block.
    pub fn writer_commit(word: &AtomicRaw, k: u32, written: usize) {
        let _ = word
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |raw| {
                let curr = State::decode(raw);
                let mut new = curr;
                new.tail = new.tail.wrapping_add(written as Raw);
                if (new.tail >> (k - 1)) != (curr.tail >> (k - 1)) {
                    new.hstate = 1;
                }
                Some(new.encode())
            })
            .expect("fetch_update with an always-Some closure cannot fail");
    }
}

/// A reader's independent position in a [`BroadcastQueue`].
///
/// Opaque: advanced only via [`BroadcastQueue::reader_commit`]. Must be
/// used only with the queue that produced it via
/// [`BroadcastQueue::attach_reader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reader {
    r: ReaderRaw,
}

/// A single-writer, multi-reader broadcast ring buffer with its capacity
/// fixed at construction.
///
/// Holds only the packed state word from spec.md §3.2 — no backing
/// storage and no per-reader bookkeeping beyond the [`Reader`] tokens
/// callers hold themselves. A thin, capacity-remembering wrapper over
/// [`raw`].
#[repr(C)]
pub struct BroadcastQueue {
    state: CacheAligned<AtomicRaw>,
    bits: BroadcastBits,
}

unsafe impl Send for BroadcastQueue {}
unsafe impl Sync for BroadcastQueue {}

impl BroadcastQueue {
    /// Creates an empty queue of capacity `2^bits.get()`, no readers
    /// attached.
    #[must_use]
    pub const fn new(bits: BroadcastBits) -> Self {
        Self { state: CacheAligned::new(AtomicRaw::new(0)), bits }
    }

    /// Returns the ring's capacity in elements.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.bits.capacity()
    }

    /// Number of readers currently attached.
    #[inline]
    #[must_use]
    pub fn reader_count(&self) -> usize {
        State::decode(self.state.load(Ordering::Relaxed)).nreaders as usize
    }

    /// Attaches a new reader, positioned at the current derived `head` —
    /// it will see every element the writer publishes from this point
    /// on, but nothing published before attachment.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::TooManyReaders`] if the reader census is
    /// already at the ceiling the packed state word can represent.
    pub fn attach_reader(&self) -> Result<Reader, AttachError> {
        raw::attach_reader(&self.state, self.bits.get()).map(|r| Reader { r })
    }

    /// Detaches a reader, folding its progress out of the reader census
    /// so the writer isn't permanently blocked waiting on it.
    pub fn detach_reader(&self, reader: Reader) {
        raw::detach_reader(&self.state, self.bits.get(), reader.r);
    }

    /// Returns the maximal contiguous (possibly two-segment) run this
    /// reader hasn't seen yet.
    #[must_use]
    pub fn reader_slice(&self, reader: &Reader) -> Span2 {
        raw::reader_slice(&self.state, self.bits.get(), reader.r, self.capacity())
    }

    /// Advances `reader` by `consumed` elements, folding a half-block
    /// crossing into the shared reader census if one occurred.
    ///
    /// # Panics
    ///
    /// Panics if `consumed` exceeds `span.len()`.
    pub fn reader_commit(&self, reader: &mut Reader, span: Span2, consumed: usize) {
        assert!(consumed <= span.len, "cannot commit more than was sliced");
        reader.r = raw::reader_commit(&self.state, self.bits.get(), reader.r, consumed);
    }

    /// Returns the maximal contiguous (possibly two-segment) run the
    /// writer may publish into right now.
    ///
    /// As a side effect, resets the reader census (`ncycled`, `hstate`)
    /// if every attached reader has caught up past the current half
    /// block — but only then. If `nreaders == 0`, or some reader hasn't
    /// caught up yet (`ncycled < nreaders`), the state word is left
    /// exactly as it was; there is no unconditional reset for the
    /// zero-readers case.
    #[must_use]
    pub fn writer_slice(&self) -> Span2 {
        raw::writer_slice(&self.state, self.bits.get())
    }

    /// Publishes `written` elements, advancing `tail` and marking
    /// `hstate` if that crossed into the next half block.
    ///
    /// # Panics
    ///
    /// Panics if `written` exceeds `span.len()`.
    pub fn writer_commit(&self, span: Span2, written: usize) {
        assert!(written <= span.len, "cannot commit more than was sliced");
        raw::writer_commit(&self.state, self.bits.get(), written);
    }
}
