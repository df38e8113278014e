//! Error types for pool construction.

use thiserror::Error;

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors surfaced while building a [`BlockPool`](crate::BlockPool).
///
/// Allocation itself never reports through this type: bucketed requests
/// always succeed, and the oversized path signals exhaustion as `None`
/// (see [`BlockPool::allocate`](crate::BlockPool::allocate)).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Page capacity cannot hold the largest size class, which would void
    /// the guarantee that a fresh page satisfies any bucketed request.
    #[error("page size {size} must exceed the maximum block size {max_block}")]
    PageTooSmall {
        /// Configured page capacity in bytes.
        size: usize,
        /// Largest bucketed block size.
        max_block: usize,
    },

    /// Page capacity must be a word multiple so every carved block keeps
    /// natural word alignment.
    #[error("page size {size} is not a multiple of the word size ({word})")]
    UnalignedPageSize {
        /// Configured page capacity in bytes.
        size: usize,
        /// Machine word size in bytes.
        word: usize,
    },
}
