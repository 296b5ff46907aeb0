//! Single-writer, multi-reader broadcast ring buffer (spec.md §3.2, §4.2).

pub(crate) mod state;

mod queue;

pub(crate) use queue::raw;
pub use queue::{BroadcastQueue, Reader, Span2};
