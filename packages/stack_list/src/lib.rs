#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A growable list that lives in caller-supplied memory and spills into a shared buffer pool.
//!
//! This crate provides [`StackList`], a list meant for short-lived scratch collections built
//! in hot code paths such as parsers or per-frame processing. The caller hands the list a
//! fixed-size buffer, typically an array on its own stack, and the list performs no memory
//! allocation for as long as the items fit. When they stop fitting, the list rents a larger
//! buffer from a [`BufferPool`][buffer_pool::BufferPool] and keeps growing from there,
//! returning every rented buffer to the pool exactly once.
//!
//! # Key Features
//!
//! - **Zero allocation in the common case**: items are stored in the borrowed buffer until it
//!   is full
//! - **Pooled growth**: larger buffers come from a reusable pool and go back to it
//! - **Scoped by construction**: the list borrows its memory, so it cannot outlive the scope
//!   that provided it
//! - **Safe after release**: a released list is simply empty and can be used again
//! - **Full list operations**: indexed access, push, insert, ordered and swap removal,
//!   search, reversal and two kinds of clearing
//!
//! # Example
//!
//! ```rust
//! use stack_list::{StackList, stack_capacity, uninit_buffer};
//!
//! fn sum_of_evens(values: &[u32]) -> u32 {
//!     // 128 items of u32 fill the default stack budget.
//!     let mut buffer = uninit_buffer::<u32, { stack_capacity::<u32>() }>();
//!     let mut evens = StackList::from_borrowed(&mut buffer);
//!
//!     for value in values {
//!         if value % 2 == 0 {
//!             evens.push(*value);
//!         }
//!     }
//!
//!     evens.iter().sum()
//! }
//!
//! assert_eq!(sum_of_evens(&[1, 2, 3, 4]), 6);
//! ```
//!
//! # Errors
//!
//! Operations that take an index or a capacity from the caller validate it before touching
//! the list and return an [`Error`] when it is invalid. Such errors indicate a bug at the
//! call site.

mod error;
mod list;
mod stack_budget;
mod storage;

pub use error::Error;
pub(crate) use error::Result;
pub use list::StackList;
pub use stack_budget::*;
pub use storage::StorageKind;
pub(crate) use storage::Storage;
