#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A thread-safe pool of reusable, uninitialized buffers.
//!
//! This crate provides [`BufferPool`], which lends out [`RentedBuffer<T>`] handles and takes
//! them back for reuse, amortizing allocation cost across many short-lived users. It is the
//! backing store for containers that normally live in a fixed-size caller-supplied region
//! and only occasionally need more room.
//!
//! # Key Features
//!
//! - **Type-erased buckets**: buffers are grouped by item [`std::alloc::Layout`] and length, so a
//!   buffer rented for `u64` items can later be reused for `i64` or `f64` items
//! - **Rounded sizes**: by default requests are rounded up to the next power of two, so the
//!   granted length may exceed the requested length
//! - **Exactly-once release**: a [`RentedBuffer<T>`] cannot be copied; it is either returned
//!   to the pool via [`BufferPool::return_buffer()`] or freed when dropped
//! - **Bounded retention**: the pool parks a limited number of buffers per bucket and frees
//!   the rest
//! - **Shared instance**: [`BufferPool::shared()`] gives access to a process-wide pool
//!
//! The pool never touches the contents of its buffers. Whoever holds a rented buffer is
//! responsible for dropping any values it placed into the buffer before returning it.
//!
//! # Example
//!
//! ```rust
//! use buffer_pool::BufferPool;
//!
//! let pool = BufferPool::new();
//!
//! let mut buffer = pool.rent::<u32>(5);
//!
//! // The default sizing rounds up to the next power of two.
//! assert_eq!(buffer.len(), 8);
//!
//! buffer.as_uninit_slice_mut()[0].write(42);
//!
//! pool.return_buffer(buffer);
//!
//! // The next rent of the same shape reuses the returned buffer.
//! let again = pool.rent::<u32>(8);
//! assert_eq!(pool.stats().allocated(), 1);
//!
//! pool.return_buffer(again);
//! ```
//!
//! # Configuration
//!
//! ```rust
//! use buffer_pool::{BufferPool, Sizing};
//!
//! let pool = BufferPool::builder()
//!     .sizing(Sizing::Exact)
//!     .retain_per_bucket(4)
//!     .build();
//!
//! let buffer = pool.rent::<u8>(100);
//! assert_eq!(buffer.len(), 100);
//!
//! pool.return_buffer(buffer);
//! ```

mod builder;
mod pool;
mod rented;
mod sizing;
mod stats;

pub use builder::*;
pub use pool::*;
pub use rented::*;
pub use sizing::*;
pub use stats::*;
