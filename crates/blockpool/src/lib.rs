//! Segregated small-object pool allocator.
//!
//! `blockpool` recycles many short-lived, fixed-size blocks for a larger
//! host application. Every request up to [`MAX_BLOCK_SIZE`] is rounded up
//! to one of 24 canonical size classes and served from:
//!
//! - a per-class LIFO free list (intrusive; the link lives inside the free
//!   block itself), falling back to
//! - one of two active bump-pointer pages, rotating in a fresh page when
//!   both are exhausted. Retired pages are archived, never reclaimed, so
//!   blocks issued from them stay valid for the life of the pool.
//!
//! Oversized requests bypass the pool entirely and go to the system
//! allocator.
//!
//! The pool is an explicit instance: own it at your composition root and
//! pass references down. There is no hidden global.
//!
//! # Example
//!
//! ```
//! use blockpool::BlockPool;
//!
//! let pool = BlockPool::new()?;
//!
//! // Bucketed sizes never fail.
//! let block = pool.allocate(24).unwrap();
//! unsafe { pool.free(block, 24) };
//! # Ok::<(), blockpool::PoolError>(())
//! ```
//!
//! # Features
//!
//! - `stats` (default): large-allocation accounting and [`PoolReport`]
//! - `logging`: rotation and oversized-path events through `tracing`

#![allow(unsafe_code)] // carving raw blocks and intrusive free lists are the point
#![warn(missing_docs)]

mod cache;
mod config;
mod error;
mod manager;
mod page;
mod size_class;
#[cfg(feature = "stats")]
mod stats;
mod sync;

pub use config::{DEFAULT_PAGE_SIZE, PoolConfig};
pub use error::{PoolError, Result};
pub use manager::{BlockPool, PoolBox};
pub use size_class::{CLASS_COUNT, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE_STEP};
#[cfg(feature = "stats")]
pub use stats::PoolReport;
