use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{self, MaybeUninit};
use std::ops::{Index, IndexMut};
use std::{ptr, slice};

use buffer_pool::BufferPool;
use tracing::trace;

use crate::{Error, Result, Storage, StorageKind};

/// Capacity of the first pool buffer rented by a list that has no capacity at all.
const FIRST_GROWTH_CAPACITY: usize = 4;

/// A growable list that starts out in memory supplied by the caller and moves into a pooled
/// buffer only when it runs out of room.
///
/// The typical use is a short-lived scratch list in a hot loop, backed by an array on the
/// stack of the calling function:
///
/// ```rust
/// use stack_list::{StackList, uninit_buffer};
///
/// let mut buffer = uninit_buffer::<u32, 32>();
/// let mut list = StackList::from_borrowed(&mut buffer);
///
/// list.push(3);
/// list.push(5);
/// list.push(7);
///
/// assert_eq!(list.iter().sum::<u32>(), 15);
/// ```
///
/// As long as the items fit into the borrowed buffer, the list performs no memory allocation.
///
/// # Growth
///
/// When an item is added to a full list, the list rents a buffer with twice the current
/// capacity (or 4 slots, if the capacity is zero) from its [`BufferPool`], moves the items
/// over and returns the previous buffer to the pool if it was rented. A borrowed buffer is
/// simply abandoned; it still belongs to the caller. Once grown, the list never goes back
/// to the borrowed buffer.
///
/// The pool may grant more slots than requested, so callers must not assume that the
/// capacity is exactly the requested value.
///
/// # Releasing pooled memory
///
/// [`release()`][Self::release] returns any rented buffer to the pool and leaves the list
/// empty with zero capacity. Dropping the list does the same, so explicit release is only
/// needed to give the memory back earlier. Releasing is idempotent and the list remains fully
/// usable afterwards: a later push simply rents a new buffer.
///
/// # Lifetime
///
/// The lifetime `'a` covers both the borrowed buffer and the pool, so the list cannot
/// outlive the scope that provided its memory. The list is neither `Clone` nor `Copy` and
/// must be passed by `&mut` to code that modifies it.
///
/// # Thread safety
///
/// The list is single-threaded (neither `Send` nor `Sync`). The pool it rents from may be
/// shared with lists on any number of other threads.
///
/// # References into the list
///
/// References obtained via [`get()`][Self::get], [`get_mut()`][Self::get_mut], indexing or
/// iteration point directly into the backing memory. Any structural operation may move the
/// items to different memory, so the borrow checker will not allow such references to be
/// held across pushes, inserts, removals, reversal or release.
pub struct StackList<'a, T> {
    storage: Storage<'a, T>,

    // The first `len` slots of `storage` are initialized. Never greater than the capacity.
    len: usize,

    pool: &'a BufferPool,

    _single_threaded: PhantomData<*const ()>,
}

impl<'a, T> StackList<'a, T> {
    /// Creates an empty list with zero capacity that rents from the
    /// [shared pool][BufferPool::shared] once the first item is added.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new() -> Self {
        Self::new_in(BufferPool::shared())
    }

    /// Creates an empty list with zero capacity that rents from `pool` once the first item
    /// is added.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new_in(pool: &'a BufferPool) -> Self {
        Self::from_storage(Storage::Empty, pool)
    }

    /// Creates an empty list that stores its items in `buffer` until it runs out of room,
    /// after which it rents from the [shared pool][BufferPool::shared].
    ///
    /// The capacity of the list is the length of `buffer`, which may be zero. The list never
    /// drops anything in the buffer that it did not put there itself.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn from_borrowed(buffer: &'a mut [MaybeUninit<T>]) -> Self {
        Self::from_borrowed_in(buffer, BufferPool::shared())
    }

    /// Creates an empty list that stores its items in `buffer` until it runs out of room,
    /// after which it rents from `pool`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn from_borrowed_in(buffer: &'a mut [MaybeUninit<T>], pool: &'a BufferPool) -> Self {
        Self::from_storage(Storage::Borrowed(buffer), pool)
    }

    /// Creates an empty list with room for at least `capacity` items, rented from the
    /// [shared pool][BufferPool::shared].
    ///
    /// A capacity of zero defers renting until the first item is added. The capacity may be
    /// given as any integer type; negative values are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is negative or does not fit in `usize`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use stack_list::{Error, StackList};
    ///
    /// let list = StackList::<u32>::with_capacity(10).unwrap();
    /// assert!(list.capacity() >= 10);
    ///
    /// let empty = StackList::<u32>::with_capacity(0).unwrap();
    /// assert_eq!(empty.capacity(), 0);
    ///
    /// assert!(matches!(
    ///     StackList::<u32>::with_capacity(-1),
    ///     Err(Error::InvalidArgument { .. })
    /// ));
    /// ```
    pub fn with_capacity<N>(capacity: N) -> Result<Self>
    where
        N: TryInto<usize>,
    {
        Self::with_capacity_in(capacity, BufferPool::shared())
    }

    /// Creates an empty list with room for at least `capacity` items, rented from `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is negative or does not fit in `usize`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn with_capacity_in<N>(capacity: N, pool: &'a BufferPool) -> Result<Self>
    where
        N: TryInto<usize>,
    {
        let Ok(capacity) = capacity.try_into() else {
            return Err(Error::InvalidArgument {
                problem: "capacity must be a non-negative integer that fits in usize".to_string(),
            });
        };

        let storage = if capacity == 0 {
            Storage::Empty
        } else {
            Storage::Pooled(pool.rent(capacity))
        };

        Ok(Self::from_storage(storage, pool))
    }

    fn from_storage(storage: Storage<'a, T>, pool: &'a BufferPool) -> Self {
        assert!(
            size_of::<T>() > 0,
            "StackList must have non-zero item size"
        );

        Self {
            storage,
            len: 0,
            pool,
            _single_threaded: PhantomData,
        }
    }

    /// The number of items in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list contains zero items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of items the list can hold before it needs to grow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// What kind of memory currently backs the list.
    #[must_use]
    pub fn storage_kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// Returns a reference to the item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is not less than [`len()`][Self::len].
    pub fn get(&self, index: usize) -> Result<&T> {
        let len = self.len;

        self.as_slice()
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Returns an exclusive reference to the item at `index`, for modifying it in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is not less than [`len()`][Self::len].
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        let len = self.len;

        self.as_mut_slice()
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Returns a reference to the item at `index` without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len()`][Self::len].
    #[must_use]
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        debug_assert!(index < self.len);

        // SAFETY: Forwarding guarantee from caller that the slot is in bounds.
        let slot = unsafe { self.items_ptr().add(index) };

        // SAFETY: Forwarding guarantee from caller that the slot is in the initialized range.
        unsafe { &*slot }
    }

    /// Returns an exclusive reference to the item at `index` without checking the bounds.
    ///
    /// # Safety
    ///
    /// `index` must be less than [`len()`][Self::len].
    #[must_use]
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        debug_assert!(index < self.len);

        // SAFETY: Forwarding guarantee from caller that the slot is in bounds.
        let slot = unsafe { self.items_mut_ptr().add(index) };

        // SAFETY: Forwarding guarantee from caller that the slot is in the initialized range.
        // We hold an exclusive reference to the list.
        unsafe { &mut *slot }
    }

    /// Appends an item to the end of the list, growing the list if it is full.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity would exceed the size of virtual memory.
    pub fn push(&mut self, item: T) {
        if self.len == self.capacity() {
            self.grow();
        }

        // SAFETY: We grew above if needed, so `len < capacity` and the slot is in bounds.
        let slot = unsafe { self.items_mut_ptr().add(self.len) };

        // SAFETY: The slot is past the initialized range, so it is vacant.
        unsafe {
            slot.write(item);
        }

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by len < capacity, which cannot exceed usize::MAX");
    }

    /// Inserts an item at position `index`, shifting all items after it to the right.
    ///
    /// Inserting at [`len()`][Self::len] is the same as [`push()`][Self::push].
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is greater than [`len()`][Self::len].
    /// The list is not modified in that case.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity would exceed the size of virtual memory.
    pub fn insert(&mut self, item: T, index: usize) -> Result<()> {
        if index > self.len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        if self.len == self.capacity() {
            self.grow();
        }

        let tail_len = self
            .len
            .checked_sub(index)
            .expect("guarded by bounds check above");

        // SAFETY: `index <= len < capacity`, so the slot pointer is within the allocation.
        let slot = unsafe { self.items_mut_ptr().add(index) };

        // SAFETY: `index + 1 <= len < capacity`, so the pointer is within the allocation.
        let next = unsafe { slot.add(1) };

        // SAFETY: The tail `[index, len)` moves to `[index + 1, len + 1)`, which fits because
        // `len < capacity`. `ptr::copy` handles the overlap.
        unsafe {
            ptr::copy(slot, next, tail_len);
        }

        // SAFETY: The slot was vacated by the move above.
        unsafe {
            slot.write(item);
        }

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by len < capacity, which cannot exceed usize::MAX");

        Ok(())
    }

    /// Removes and returns the item at `index`, shifting all items after it to the left.
    ///
    /// This preserves the order of the remaining items and takes time proportional to the
    /// number of items after `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is not less than [`len()`][Self::len].
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        self.check_index(index)?;

        // SAFETY: Bounds checked above.
        Ok(unsafe { self.take_at(index) })
    }

    /// Removes and returns the item at `index`, replacing it with the last item in the list.
    ///
    /// This takes constant time but does not preserve the order of the remaining items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is not less than [`len()`][Self::len].
    pub fn remove_swap_back(&mut self, index: usize) -> Result<T> {
        self.check_index(index)?;

        let last = self
            .len
            .checked_sub(1)
            .expect("guarded by bounds check above, the list is not empty");

        let items = self.items_mut_ptr();

        // SAFETY: Bounds checked above.
        let slot = unsafe { items.add(index) };

        // SAFETY: The slot holds an initialized item. Ownership moves to the caller and the
        // slot is overwritten or excluded from the initialized range below.
        let item = unsafe { slot.read() };

        if index != last {
            // SAFETY: `last` is in bounds.
            let last_slot = unsafe { items.add(last) };

            // SAFETY: The last slot holds an initialized item, which we move into the vacated
            // slot. The two slots are distinct.
            unsafe {
                ptr::copy_nonoverlapping(last_slot, slot, 1);
            }
        }

        self.len = last;

        Ok(item)
    }

    /// Removes the first item equal to `item`, preserving the order of the remaining items.
    ///
    /// Returns whether an item was removed. If no item is equal to `item`, the list is not
    /// modified.
    pub fn remove_value(&mut self, item: &T) -> bool
    where
        T: PartialEq,
    {
        let Some(index) = self.index_of(item) else {
            return false;
        };

        // SAFETY: `index_of()` only returns indexes of items in the list.
        drop(unsafe { self.take_at(index) });

        true
    }

    /// Whether the list contains an item equal to `item`.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_of(item).is_some()
    }

    /// The index of the first item equal to `item`, or `None` if there is no such item.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.as_slice().iter().position(|candidate| candidate == item)
    }

    /// Reverses the order of the items.
    ///
    /// The items are moved into a newly rented buffer sized for the current number of items,
    /// so after this call the capacity equals [`len()`][Self::len]. A previously rented buffer
    /// is returned to the pool and a borrowed buffer is abandoned. Reversing an empty list
    /// leaves it with no storage at all.
    pub fn reverse(&mut self) {
        let len = self.len;

        trace!(item = type_name::<T>(), len, "reversing list");

        if len == 0 {
            self.replace_storage(Storage::Empty);
            return;
        }

        let mut buffer = self.pool.rent::<T>(len);
        buffer.truncate(len);

        let source = self.items_ptr();
        let target = buffer.as_mut_ptr().cast::<T>();

        for (index, mirrored) in (0..len).zip((0..len).rev()) {
            // SAFETY: `index < len`, which fits in the current storage.
            let from = unsafe { source.add(index) };

            // SAFETY: `mirrored < len`, which fits in the new buffer.
            let to = unsafe { target.add(mirrored) };

            // SAFETY: The source slot is initialized and the buffers are distinct allocations.
            // The source slots are abandoned below, so every item is moved exactly once.
            unsafe {
                ptr::copy_nonoverlapping(from, to, 1);
            }
        }

        self.replace_storage(Storage::Pooled(buffer));
    }

    /// Removes all items, keeping the current storage for reuse by later pushes.
    pub fn clear(&mut self) {
        let len = mem::replace(&mut self.len, 0);

        let items = ptr::slice_from_raw_parts_mut(self.items_mut_ptr(), len);

        // SAFETY: The first `len` slots were initialized. We already set `len` to zero, so
        // even a panicking destructor cannot lead to an item being dropped twice.
        unsafe {
            ptr::drop_in_place(items);
        }
    }

    /// Removes all items and returns a rented buffer to the pool right away.
    ///
    /// A borrowed buffer is kept, as holding on to it costs nothing.
    pub fn clear_and_release(&mut self) {
        self.clear();

        if self.storage.kind() == StorageKind::Pooled {
            self.replace_storage(Storage::Empty);
        }
    }

    /// Removes all items, returns any rented buffer to the pool and stops using any borrowed
    /// buffer, leaving the list empty with zero capacity.
    ///
    /// This happens automatically when the list is dropped. Calling it more than once is
    /// harmless and the list can still be used afterwards, renting a new buffer when needed.
    pub fn release(&mut self) {
        self.clear();
        self.replace_storage(Storage::Empty);
    }

    /// The items in the list, as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: The first `len` slots are initialized and the pointer is valid (or dangling
        // and aligned if `len` is zero).
        unsafe { slice::from_raw_parts(self.items_ptr(), self.len) }
    }

    /// The items in the list, as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: As in `as_slice()`, plus we hold an exclusive reference to the list.
        unsafe { slice::from_raw_parts_mut(self.items_mut_ptr(), self.len) }
    }

    /// Iterates over references to the items in the list.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterates over exclusive references to the items in the list.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len,
            });
        }

        Ok(())
    }

    /// Moves the item at `index` out of the list, shifting the items after it to the left.
    ///
    /// # Safety
    ///
    /// `index` must be less than `len`.
    unsafe fn take_at(&mut self, index: usize) -> T {
        let tail_len = self
            .len
            .checked_sub(index)
            .and_then(|after_index| after_index.checked_sub(1))
            .expect("guaranteed by caller that index < len");

        // SAFETY: Forwarding guarantee from caller that the slot is in bounds.
        let slot = unsafe { self.items_mut_ptr().add(index) };

        // SAFETY: The slot holds an initialized item. Ownership moves to the caller and the
        // slot is overwritten by the shift below.
        let item = unsafe { slot.read() };

        // SAFETY: `index < len <= capacity`, so one past the slot is within or at the end of
        // the allocation.
        let next = unsafe { slot.add(1) };

        // SAFETY: The tail `(index, len)` moves one slot to the left, staying within
        // `[index, len - 1)`. `ptr::copy` handles the overlap.
        unsafe {
            ptr::copy(next, slot, tail_len);
        }

        self.len = self
            .len
            .checked_sub(1)
            .expect("guaranteed by caller that the list is not empty");

        item
    }

    fn grow(&mut self) {
        let capacity = self.capacity();

        let desired = if capacity == 0 {
            FIRST_GROWTH_CAPACITY
        } else {
            capacity
                .checked_mul(2)
                .expect("list capacity cannot exceed the size of virtual memory")
        };

        trace!(
            item = type_name::<T>(),
            from = capacity,
            to = desired,
            "growing list"
        );

        let mut buffer = self.pool.rent::<T>(desired);

        // SAFETY: The new buffer has at least `desired > len` slots, the first `len` slots of
        // the current storage are initialized and the two are distinct allocations. The old
        // slots are abandoned below, so every item is moved exactly once.
        unsafe {
            ptr::copy_nonoverlapping(self.items_ptr(), buffer.as_mut_ptr().cast::<T>(), self.len);
        }

        self.replace_storage(Storage::Pooled(buffer));
    }

    /// Installs new storage and returns the previous storage to the pool if it was rented.
    ///
    /// The caller must already have moved or dropped all items in the previous storage.
    fn replace_storage(&mut self, storage: Storage<'a, T>) {
        if let Storage::Pooled(previous) = mem::replace(&mut self.storage, storage) {
            trace!(
                item = type_name::<T>(),
                len = previous.len(),
                "returning list buffer to pool"
            );

            self.pool.return_buffer(previous);
        }
    }

    fn items_ptr(&self) -> *const T {
        self.storage.as_ptr().cast()
    }

    fn items_mut_ptr(&mut self) -> *mut T {
        self.storage.as_mut_ptr().cast()
    }
}

impl<T> Default for StackList<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for StackList<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T> Index<usize> for StackList<'_, T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Ok(item) => item,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<T> IndexMut<usize> for StackList<'_, T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match self.get_mut(index) {
            Ok(item) => item,
            Err(error) => panic!("{error}"),
        }
    }
}

impl<T> Extend<T> for StackList<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<'l, T> IntoIterator for &'l StackList<'_, T> {
    type Item = &'l T;
    type IntoIter = slice::Iter<'l, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'l, T> IntoIterator for &'l mut StackList<'_, T> {
    type Item = &'l mut T;
    type IntoIter = slice::IterMut<'l, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T: fmt::Debug> fmt::Debug for StackList<'_, T> {
    #[cfg_attr(test, mutants::skip)] // Debug output is informational, not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("items", &self.as_slice())
            .field("capacity", &self.capacity())
            .field("storage", &self.storage_kind())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(
        clippy::indexing_slicing,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::cell::Cell;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::uninit_buffer;

    assert_not_impl_any!(StackList<'static, u32>: Send, Sync, Clone, Copy);

    /// Counts how many times values were dropped, so we can verify exactly-once dropping.
    #[derive(Debug)]
    struct Tracked<'c> {
        value: u32,
        drops: &'c Cell<usize>,
    }

    impl<'c> Tracked<'c> {
        fn new(value: u32, drops: &'c Cell<usize>) -> Self {
            Self { value, drops }
        }
    }

    impl PartialEq for Tracked<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.value == other.value
        }
    }

    impl Drop for Tracked<'_> {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    #[test]
    fn smoke_test() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);

        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert_eq!(list.capacity(), 0);

        list.push(1);
        list.push(2);
        list.push(3);

        assert_eq!(list.len(), 3);
        assert!(!list.is_empty());
        assert_eq!(list.as_slice(), &[1, 2, 3]);
        assert_eq!(*list.get(1).unwrap(), 2);
        assert_eq!(list[2], 3);
    }

    #[test]
    fn growth_from_capacity_one_doubles() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(1, &pool).unwrap();
        assert_eq!(list.capacity(), 1);

        let mut capacities = vec![list.capacity()];

        for value in [2, 4, 6, 8, 10] {
            list.push(value);

            if capacities.last() != Some(&list.capacity()) {
                capacities.push(list.capacity());
            }
        }

        assert_eq!(list.len(), 5);
        assert_eq!(capacities, vec![1, 2, 4, 8]);
        assert_eq!(list.as_slice(), &[2, 4, 6, 8, 10]);
    }

    #[test]
    fn growth_from_empty_starts_at_four_and_doubles() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);

        list.push(0_u64);
        assert_eq!(list.capacity(), 4);

        list.extend(1..5);
        assert_eq!(list.capacity(), 8);

        list.extend(5..9);
        assert_eq!(list.capacity(), 16);

        assert_eq!(list.as_slice(), (0..9).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn growth_returns_previous_buffer_once() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(1, &pool).unwrap();

        list.extend([1, 2, 3, 4, 5]);

        // Rented 1, 2, 4 and 8 slots; all but the last one are already back.
        let stats = pool.stats();
        assert_eq!(stats.rented(), 4);
        assert_eq!(stats.returned(), 3);
        assert_eq!(stats.outstanding(), 1);
    }

    #[test]
    fn borrowed_buffer_grows_into_pool() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 2>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);

        assert_eq!(list.capacity(), 2);
        assert_eq!(list.storage_kind(), StorageKind::Borrowed);

        list.push(5);
        list.push(10);

        assert_eq!(list.storage_kind(), StorageKind::Borrowed);
        assert_eq!(pool.stats().rented(), 0);

        list.push(15);

        assert_eq!(list.storage_kind(), StorageKind::Pooled);
        assert_eq!(list.capacity(), 4);
        assert_eq!(list.as_slice(), &[5, 10, 15]);
        assert_eq!(pool.stats().rented(), 1);
        assert_eq!(pool.stats().returned(), 0);
    }

    #[test]
    fn zero_length_borrowed_buffer_rents_on_first_push() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 0>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);

        assert_eq!(list.capacity(), 0);

        list.push(1);

        assert_eq!(list.storage_kind(), StorageKind::Pooled);
        assert_eq!(list.capacity(), 4);
    }

    #[test]
    fn with_capacity_rejects_negative() {
        let pool = BufferPool::new();

        let result = StackList::<u32>::with_capacity_in(-1, &pool);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));

        let result = StackList::<u32>::with_capacity_in(i64::MIN, &pool);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));

        assert_eq!(pool.stats().rented(), 0);
    }

    #[test]
    fn with_capacity_zero_defers_allocation() {
        let pool = BufferPool::new();
        let list = StackList::<u32>::with_capacity_in(0, &pool).unwrap();

        assert_eq!(list.capacity(), 0);
        assert_eq!(list.storage_kind(), StorageKind::Empty);
        assert_eq!(pool.stats().rented(), 0);
    }

    #[test]
    fn with_capacity_may_exceed_request() {
        let pool = BufferPool::new();
        let list = StackList::<u32>::with_capacity_in(10_usize, &pool).unwrap();

        assert!(list.capacity() >= 10);
        assert_eq!(list.storage_kind(), StorageKind::Pooled);
        assert_eq!(pool.stats().rented(), 1);
    }

    #[test]
    #[should_panic]
    fn zero_sized_items_panic() {
        let pool = BufferPool::new();

        _ = StackList::<()>::new_in(&pool);
    }

    #[test]
    fn get_out_of_range_reports_index_and_len() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.push(1);

        assert_eq!(list.get(1), Err(Error::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(
            list.get_mut(5).unwrap_err(),
            Error::IndexOutOfRange { index: 5, len: 1 }
        );
    }

    #[test]
    fn get_beyond_len_but_within_capacity_fails() {
        let pool = BufferPool::new();
        let list = StackList::<u32>::with_capacity_in(8, &pool).unwrap();

        assert!(list.get(0).is_err());
    }

    #[test]
    fn get_mut_modifies_in_place() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 2, 3]);

        *list.get_mut(1).unwrap() += 40;
        list[2] = 7;

        assert_eq!(list.as_slice(), &[1, 42, 7]);
    }

    #[test]
    fn get_unchecked_reads_items() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 2, 3]);

        // SAFETY: Index is below len.
        unsafe {
            *list.get_unchecked_mut(0) = 9;
        }

        // SAFETY: Index is below len.
        assert_eq!(unsafe { *list.get_unchecked(0) }, 9);
    }

    #[test]
    #[should_panic]
    fn index_out_of_range_panics() {
        let pool = BufferPool::new();
        let list = StackList::<u32>::with_capacity_in(4, &pool).unwrap();

        let _item = list[0];
    }

    #[test]
    fn insert_at_start_middle_and_end() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([2, 4]);

        list.insert(1, 0).unwrap();
        list.insert(3, 2).unwrap();
        list.insert(5, 4).unwrap();

        assert_eq!(list.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn insert_into_full_list_grows() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(2, &pool).unwrap();
        list.extend([1, 3]);
        assert_eq!(list.capacity(), 2);

        list.insert(2, 1).unwrap();

        assert_eq!(list.capacity(), 4);
        assert_eq!(list.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn insert_beyond_len_fails_without_change() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(1, &pool).unwrap();
        list.push(1);

        assert_eq!(
            list.insert(2, 2),
            Err(Error::IndexOutOfRange { index: 2, len: 1 })
        );

        // Full list, but the rejected insert must not have grown it.
        assert_eq!(list.capacity(), 1);
        assert_eq!(list.as_slice(), &[1]);
        assert_eq!(pool.stats().rented(), 1);
    }

    #[test]
    fn remove_at_preserves_order() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([0, 2, 4, 6, 8]);

        assert_eq!(list.remove_at(0), Ok(0));
        assert_eq!(list.as_slice(), &[2, 4, 6, 8]);

        assert_eq!(list.remove_at(1), Ok(4));
        assert_eq!(list.as_slice(), &[2, 6, 8]);

        assert_eq!(list.remove_at(2), Ok(8));
        assert_eq!(list.as_slice(), &[2, 6]);
    }

    #[test]
    fn remove_at_out_of_range_fails() {
        let pool = BufferPool::new();
        let mut list = StackList::<u32>::new_in(&pool);

        assert_eq!(
            list.remove_at(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn remove_swap_back_moves_last_item() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(1, &pool).unwrap();
        list.extend([1, 2, 3]);

        assert_eq!(list.remove_swap_back(0), Ok(1));

        assert_eq!(list[0], 3);
        assert_eq!(list.as_slice(), &[3, 2]);
    }

    #[test]
    fn remove_swap_back_last_item() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 2, 3]);

        assert_eq!(list.remove_swap_back(2), Ok(3));
        assert_eq!(list.as_slice(), &[1, 2]);
    }

    #[test]
    fn remove_swap_back_out_of_range_fails() {
        let pool = BufferPool::new();
        let mut list = StackList::<u32>::with_capacity_in(1, &pool).unwrap();

        assert_eq!(
            list.remove_swap_back(0),
            Err(Error::IndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn remove_value_from_middle() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(10, &pool).unwrap();
        list.extend([0, 2, 4, 6, 8]);

        assert!(list.remove_value(&4));

        assert_eq!(list.as_slice(), &[0, 2, 6, 8]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_value_removes_first_match_only() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 5, 2, 5]);

        assert!(list.remove_value(&5));

        assert_eq!(list.as_slice(), &[1, 2, 5]);
    }

    #[test]
    fn remove_value_missing_leaves_list_unchanged() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([5, 10]);

        assert!(!list.remove_value(&2));

        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice(), &[5, 10]);
    }

    #[test]
    fn contains_and_index_of() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);

        assert!(!list.contains(&10));
        assert_eq!(list.index_of(&10), None);

        list.extend([5, 10, 10]);

        assert!(list.contains(&10));
        assert_eq!(list.index_of(&10), Some(1));
        assert_eq!(list.index_of(&5), Some(0));

        assert!(list.remove_value(&5));
        assert!(!list.contains(&5));
    }

    #[test]
    fn reverse_twice_restores_order() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 2, 3, 4, 5]);

        list.reverse();
        assert_eq!(list.as_slice(), &[5, 4, 3, 2, 1]);

        list.reverse();
        assert_eq!(list.as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn reverse_shrinks_capacity_to_len() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(16, &pool).unwrap();
        list.extend([1, 2, 3]);

        list.reverse();

        assert_eq!(list.capacity(), 3);
        assert_eq!(list.as_slice(), &[3, 2, 1]);

        // The previous buffer went back; only the new one is outstanding.
        assert_eq!(pool.stats().outstanding(), 1);

        // Growth continues from the shrunken capacity.
        list.push(0);
        assert_eq!(list.capacity(), 8);
    }

    #[test]
    fn reverse_returns_whole_allocation_to_pool() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 3>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);
        list.extend([1, 2, 3]);

        // Rents 3 slots, which the pool rounds up to 4, then hides the 4th.
        list.reverse();
        assert_eq!(list.capacity(), 3);
        assert_eq!(pool.stats().allocated(), 1);

        list.release();
        assert_eq!(pool.stats().retained(), 1);

        // The released buffer must be parked under its full length to be found again.
        let reused = pool.rent::<u32>(4);
        assert_eq!(reused.allocated_len(), 4);
        assert_eq!(pool.stats().allocated(), 1);
        assert_eq!(pool.stats().retained(), 0);

        pool.return_buffer(reused);
    }

    #[test]
    fn reverse_moves_borrowed_items_into_pool() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 8>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);
        list.extend([1, 2]);

        list.reverse();

        assert_eq!(list.storage_kind(), StorageKind::Pooled);
        assert_eq!(list.capacity(), 2);
        assert_eq!(list.as_slice(), &[2, 1]);
    }

    #[test]
    fn reverse_empty_drops_storage() {
        let pool = BufferPool::new();
        let mut list = StackList::<u32>::with_capacity_in(4, &pool).unwrap();

        list.reverse();

        assert_eq!(list.capacity(), 0);
        assert_eq!(list.storage_kind(), StorageKind::Empty);
        assert_eq!(pool.stats().outstanding(), 0);
    }

    #[test]
    fn clear_keeps_buffer() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([0, 5, 10]);

        list.clear();

        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 4);
        assert_eq!(list.storage_kind(), StorageKind::Pooled);

        list.extend([1, 2, 3, 4]);
        assert_eq!(pool.stats().rented(), 1);
    }

    #[test]
    fn clear_and_release_returns_pooled_buffer() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([0, 5, 10]);

        list.clear_and_release();

        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 0);
        assert_eq!(list.storage_kind(), StorageKind::Empty);
        assert_eq!(pool.stats().outstanding(), 0);
    }

    #[test]
    fn clear_and_release_keeps_borrowed_buffer() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 4>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);
        list.extend([0, 5, 10]);

        list.clear_and_release();

        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 4);
        assert_eq!(list.storage_kind(), StorageKind::Borrowed);
    }

    #[test]
    fn release_resets_to_empty() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 4>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);
        list.extend([1, 2]);

        list.release();

        assert_eq!(list.len(), 0);
        assert_eq!(list.capacity(), 0);
        assert_eq!(list.storage_kind(), StorageKind::Empty);
    }

    #[test]
    fn release_returns_buffer_exactly_once() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 2, 3]);

        list.release();
        list.release();

        let stats = pool.stats();
        assert_eq!(stats.rented(), 1);
        assert_eq!(stats.returned(), 1);
        assert_eq!(stats.retained(), 1);
    }

    #[test]
    fn push_after_release_rents_again() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 10>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);
        list.extend([2, 4, 6]);

        list.release();
        list.push(10);

        assert_eq!(list[0], 10);
        assert_eq!(list.len(), 1);
        assert_eq!(list.storage_kind(), StorageKind::Pooled);

        drop(list);

        let stats = pool.stats();
        assert_eq!(stats.rented(), 1);
        assert_eq!(stats.returned(), 1);
    }

    #[test]
    fn drop_returns_buffer() {
        let pool = BufferPool::new();

        {
            let mut list = StackList::new_in(&pool);
            list.extend(0..100_u32);
        }

        let stats = pool.stats();
        assert!(stats.rented() > 1);
        assert_eq!(stats.outstanding(), 0);
    }

    #[test]
    fn items_are_dropped_exactly_once() {
        let drops = Cell::new(0);
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<Tracked<'_>, 2>();

        {
            let mut list = StackList::from_borrowed_in(&mut buffer, &pool);

            // Growth moves items without dropping them.
            for value in 0..6 {
                list.push(Tracked::new(value, &drops));
            }
            assert_eq!(drops.get(), 0);

            let removed = list.remove_at(0).unwrap();
            assert_eq!(removed.value, 0);
            drop(removed);
            assert_eq!(drops.get(), 1);

            drop(list.remove_swap_back(0).unwrap());
            assert_eq!(drops.get(), 2);

            // Comparing creates and drops the probe value, plus the removed item.
            assert!(list.remove_value(&Tracked::new(3, &drops)));
            assert_eq!(drops.get(), 4);

            list.reverse();
            assert_eq!(drops.get(), 4);

            assert_eq!(list.len(), 3);
        }

        assert_eq!(drops.get(), 7);
    }

    #[test]
    fn clear_drops_items() {
        let drops = Cell::new(0);
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);

        list.push(Tracked::new(1, &drops));
        list.push(Tracked::new(2, &drops));

        list.clear();
        assert_eq!(drops.get(), 2);

        list.release();
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn owned_items_survive_growth() {
        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<String, 1>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);

        for word in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            list.push(word.to_string());
        }

        list.insert("zeta".to_string(), 0).unwrap();

        assert_eq!(
            list.as_slice(),
            &["zeta", "alpha", "beta", "gamma", "delta", "epsilon"]
        );
    }

    #[test]
    fn iteration_visits_items_in_order() {
        let pool = BufferPool::new();
        let mut list = StackList::with_capacity_in(10, &pool).unwrap();
        list.extend([3, 5, 7]);

        let mut sum = 0;
        for item in &list {
            sum += item;
        }
        assert_eq!(sum, 3 + 5 + 7);

        for item in &mut list {
            *item *= 2;
        }
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![6, 10, 14]);
    }

    #[test]
    fn mutation_through_exclusive_reference() {
        fn add_num(list: &mut StackList<'_, u32>, num: u32) {
            list.push(num);
        }

        let pool = BufferPool::new();
        let mut buffer = uninit_buffer::<u32, 10>();
        let mut list = StackList::from_borrowed_in(&mut buffer, &pool);

        add_num(&mut list, 2);
        add_num(&mut list, 5);
        add_num(&mut list, 7);

        assert_eq!(list.as_slice(), &[2, 5, 7]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn debug_output_lists_items() {
        let pool = BufferPool::new();
        let mut list = StackList::new_in(&pool);
        list.extend([1, 2]);

        let output = format!("{list:?}");

        assert!(output.contains("[1, 2]"));
        assert!(output.contains("Pooled"));
    }

    #[test]
    fn default_uses_shared_pool() {
        let mut list = StackList::<u64>::default();

        list.push(1);

        assert_eq!(list.as_slice(), &[1]);
    }
}
