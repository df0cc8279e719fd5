use std::mem::MaybeUninit;
use std::ptr::NonNull;

use buffer_pool::RentedBuffer;

/// Identifies what kind of memory currently backs a [`StackList`][crate::StackList].
///
/// # Examples
///
/// ```
/// use stack_list::{StackList, StorageKind, uninit_buffer};
///
/// let mut buffer = uninit_buffer::<u32, 2>();
/// let mut list = StackList::from_borrowed(&mut buffer);
/// assert_eq!(list.storage_kind(), StorageKind::Borrowed);
///
/// list.push(1);
/// list.push(2);
/// list.push(3);
/// assert_eq!(list.storage_kind(), StorageKind::Pooled);
///
/// list.release();
/// assert_eq!(list.storage_kind(), StorageKind::Empty);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum StorageKind {
    /// No memory at all. The capacity is zero and the next push will rent from the pool.
    Empty,

    /// Memory supplied by the caller, which the list uses but does not own.
    Borrowed,

    /// Memory rented from a pool, which the list must return exactly once.
    Pooled,
}

/// The backing memory of a list. At most one pooled buffer is owned at any time and a
/// borrowed buffer is never released by the list.
pub(crate) enum Storage<'a, T> {
    Empty,
    Borrowed(&'a mut [MaybeUninit<T>]),
    Pooled(RentedBuffer<T>),
}

impl<T> Storage<'_, T> {
    pub(crate) fn kind(&self) -> StorageKind {
        match self {
            Self::Empty => StorageKind::Empty,
            Self::Borrowed(_) => StorageKind::Borrowed,
            Self::Pooled(_) => StorageKind::Pooled,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Borrowed(slots) => slots.len(),
            Self::Pooled(buffer) => buffer.len(),
        }
    }

    /// Valid for reads of `capacity()` slots. Dangling but aligned if the capacity is zero.
    pub(crate) fn as_ptr(&self) -> *const MaybeUninit<T> {
        match self {
            Self::Empty => NonNull::dangling().as_ptr(),
            Self::Borrowed(slots) => slots.as_ptr(),
            Self::Pooled(buffer) => buffer.as_ptr(),
        }
    }

    /// Valid for reads and writes of `capacity()` slots. Dangling but aligned if the capacity
    /// is zero.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut MaybeUninit<T> {
        match self {
            Self::Empty => NonNull::dangling().as_ptr(),
            Self::Borrowed(slots) => slots.as_mut_ptr(),
            Self::Pooled(buffer) => buffer.as_mut_ptr(),
        }
    }
}
