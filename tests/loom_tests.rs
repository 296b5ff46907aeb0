//! Loom-based concurrency tests for the SPSC protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores thread interleavings; it needs its own
//! atomic types, so the protocol is reimplemented here against
//! `loom::sync::atomic` rather than against the real `SpscQueue` (which
//! is hardwired to `std::sync::atomic`). Capacity is kept tiny (4) to
//! keep the explored state space tractable.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicUsize, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

const K: u32 = 2; // capacity 4
const MASK: usize = (1 << K) - 1;

struct LoomSpsc {
    tail: AtomicUsize,
    head: AtomicUsize,
    buf: UnsafeCell<[u64; 4]>,
}

unsafe impl Send for LoomSpsc {}
unsafe impl Sync for LoomSpsc {}

impl LoomSpsc {
    fn new() -> Self {
        Self { tail: AtomicUsize::new(0), head: AtomicUsize::new(0), buf: UnsafeCell::new([0; 4]) }
    }

    fn push_slice(&self) -> (usize, usize) {
        let head_v = self.head.load(Ordering::Acquire);
        let tail_v = self.tail.load(Ordering::Relaxed);
        let cond = (tail_v >> K).wrapping_sub(head_v >> K) & 1;
        let count = (MASK + 1) - tail_v.wrapping_sub(head_v) - (head_v & MASK) * (1 - cond);
        (tail_v & MASK, count)
    }

    fn commit_push(&self, n: usize) {
        let tail_v = self.tail.load(Ordering::Relaxed);
        self.tail.store(tail_v.wrapping_add(n), Ordering::Release);
    }

    fn pop_slice(&self) -> (usize, usize) {
        let tail_v = self.tail.load(Ordering::Acquire);
        let head_v = self.head.load(Ordering::Relaxed);
        let cond = (tail_v >> K).wrapping_sub(head_v >> K) & 1;
        let count = tail_v.wrapping_sub(head_v) - (tail_v & MASK) * cond;
        (head_v & MASK, count)
    }

    fn commit_pop(&self, n: usize) {
        let head_v = self.head.load(Ordering::Relaxed);
        self.head.store(head_v.wrapping_add(n), Ordering::Release);
    }

    fn write(&self, idx: usize, v: u64) {
        unsafe { (*self.buf.get())[idx] = v };
    }

    fn read(&self, idx: usize) -> u64 {
        unsafe { (*self.buf.get())[idx] }
    }
}

#[test]
fn loom_single_element_handoff_is_ordered() {
    loom::model(|| {
        let q = Arc::new(LoomSpsc::new());
        let q2 = Arc::clone(&q);

        let producer = thread::spawn(move || {
            let (idx, count) = q2.push_slice();
            assert!(count >= 1);
            q2.write(idx, 0xAB);
            q2.commit_push(1);
        });

        let consumer = thread::spawn(move || {
            let mut value = None;
            for _ in 0..20 {
                let (idx, count) = q.pop_slice();
                if count >= 1 {
                    value = Some(q.read(idx));
                    q.commit_pop(1);
                    break;
                }
                loom::thread::yield_now();
            }
            value
        });

        producer.join().unwrap();
        let value = consumer.join().unwrap();
        if let Some(v) = value {
            assert_eq!(v, 0xAB, "consumer must never observe a torn or stale write");
        }
    });
}

#[test]
fn loom_commit_never_exceeds_capacity() {
    loom::model(|| {
        let q = Arc::new(LoomSpsc::new());
        let q2 = Arc::clone(&q);

        let producer = thread::spawn(move || {
            for _ in 0..3 {
                let (idx, count) = q2.push_slice();
                if count == 0 {
                    continue;
                }
                q2.write(idx, 1);
                q2.commit_push(1);
            }
        });

        let consumer = thread::spawn(move || {
            for _ in 0..3 {
                let (_, count) = q.pop_slice();
                if count == 0 {
                    continue;
                }
                q.commit_pop(1);
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();

        let tail = q.tail.load(Ordering::SeqCst);
        let head = q.head.load(Ordering::SeqCst);
        assert!(tail.wrapping_sub(head) <= 4);
    });
}
