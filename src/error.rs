//! The single recoverable error this crate can return.

use thiserror::Error;

/// Error returned by [`crate::broadcast::BroadcastQueue::attach_reader`].
///
/// Every other operation in this crate is infallible: absence of data is
/// a zero-length [`crate::spsc::Span`]/[`crate::broadcast::Span2`], never
/// an error (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The reader census is already at the ceiling the packed state word
    /// can represent; detach an existing reader and retry.
    #[error("too many readers attached (max: {max})")]
    TooManyReaders {
        /// The configured maximum number of simultaneously attached readers.
        max: usize,
    },
}
