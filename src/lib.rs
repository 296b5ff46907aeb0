//! ringslice - lock-free bounded ring buffers over caller-owned storage
//!
//! Two queue kinds, both storing nothing but a handful of atomic counters
//! and leaving the actual element storage to the caller:
//!
//! - [`spsc::SpscQueue`]: single-producer single-consumer, data is
//!   consumed once.
//! - [`broadcast::BroadcastQueue`]: single-writer, multiple readers, every
//!   reader sees every element.
//!
//! Both follow the same shape: ask for a contiguous run with a `_slice`
//! call, read or write directly into the caller's array at the returned
//! `(index, count)`, then publish how much was actually used with a
//! `commit` call. Nothing here allocates, blocks, or spins — callers
//! that want a bounded poll loop can reach for [`Backoff`].
//!
//! # Example
//!
//! ```
//! use ringslice::{RingBits, SpscQueue};
//!
//! let q = SpscQueue::new(RingBits::new(4)); // capacity 16
//! let mut buf = [0u8; 16];
//!
//! let mut w = q.write_slice(&mut buf);
//! w.as_mut_slice()[..5].copy_from_slice(b"hello");
//! w.commit_n(5);
//!
//! let r = q.read_slice(&buf);
//! assert_eq!(r.as_slice(), b"hello");
//! r.commit();
//! ```

mod backoff;
mod broadcast;
mod cache;
mod config;
mod error;
mod invariants;
mod spsc;

pub use backoff::Backoff;
pub use broadcast::{BroadcastQueue, Reader, Span2};
pub use config::{BroadcastBits, RingBits};
pub use error::AttachError;
pub use spsc::{ReadGuard, Span, SpscQueue, WriteGuard};

/// Bare free-function protocol operating directly on a counter pair, with
/// the capacity exponent passed per call instead of stored. Exposed for
/// callers assembling their own wrapper around the counter pair instead
/// of using [`SpscQueue`].
///
/// The broadcast queue's equivalent raw protocol stays crate-internal:
/// its packed state word is an implementation detail, not something
/// callers should be encoding or decoding themselves.
pub use spsc::raw;
