use std::mem::MaybeUninit;

/// The number of bytes of stack that a caller may reasonably dedicate to the borrowed buffer
/// of one [`StackList`][crate::StackList].
///
/// This is advisory. The list accepts borrowed buffers of any length.
pub const STACK_BUDGET_BYTES: usize = 512;

/// The maximum number of `T` items that fit into [`STACK_BUDGET_BYTES`].
///
/// Returns zero for zero-sized types, which a list cannot hold anyway.
///
/// # Examples
///
/// ```
/// use stack_list::stack_capacity;
///
/// assert_eq!(stack_capacity::<u32>(), 128);
/// assert_eq!(stack_capacity::<u64>(), 64);
/// assert_eq!(stack_capacity::<[u8; 1000]>(), 0);
/// ```
#[must_use]
pub const fn stack_capacity<T>() -> usize {
    match STACK_BUDGET_BYTES.checked_div(size_of::<T>()) {
        Some(capacity) => capacity,
        None => 0,
    }
}

/// Creates an array of `N` uninitialized slots, suitable as the borrowed buffer of a
/// [`StackList`][crate::StackList].
///
/// Creating the array is free. No memory is written.
///
/// # Examples
///
/// ```
/// use stack_list::{StackList, uninit_buffer};
///
/// let mut buffer = uninit_buffer::<u64, 16>();
/// let list = StackList::<u64>::from_borrowed(&mut buffer);
///
/// assert_eq!(list.capacity(), 16);
/// ```
#[must_use]
pub const fn uninit_buffer<T, const N: usize>() -> [MaybeUninit<T>; N] {
    [const { MaybeUninit::<T>::uninit() }; N]
}
