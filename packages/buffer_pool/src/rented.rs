use std::alloc::{Layout, dealloc};
use std::any::type_name;
use std::fmt;
use std::mem::{ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;
use std::slice;

/// An exclusive handle to a buffer of uninitialized `T` slots rented from a
/// [`BufferPool`][crate::BufferPool].
///
/// The handle cannot be cloned or copied, so there is always exactly one party responsible
/// for releasing the buffer. It is released in one of two ways:
///
/// * [`BufferPool::return_buffer()`][crate::BufferPool::return_buffer] consumes the handle and
///   makes the buffer available for reuse.
/// * Dropping the handle frees the memory without giving it back to the pool.
///
/// The buffer never drops the values stored in it. The holder must drop or move out any
/// initialized slots before releasing the buffer, otherwise those values are leaked.
///
/// # View length
///
/// The allocation backing the buffer has [`allocated_len()`][Self::allocated_len] slots. The
/// visible part of it, exposed through [`len()`][Self::len] and the slice accessors, may be
/// shortened via [`truncate()`][Self::truncate]. The full allocation is still returned to the
/// pool when the buffer is released.
pub struct RentedBuffer<T> {
    ptr: NonNull<MaybeUninit<T>>,

    // Slot count of the allocation. Zero means there is no allocation at all.
    allocated_len: usize,

    // Number of slots visible to the holder. Never greater than `allocated_len`.
    len: usize,
}

impl<T> RentedBuffer<T> {
    /// A buffer with no slots, backed by no allocation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            allocated_len: 0,
            len: 0,
        }
    }

    /// # Safety
    ///
    /// `ptr` must point to a global allocator allocation with the layout of
    /// `[T; allocated_len]`, with `allocated_len` non-zero. Ownership of the allocation is
    /// transferred to the new buffer.
    pub(crate) unsafe fn from_raw_parts(
        ptr: NonNull<MaybeUninit<T>>,
        allocated_len: usize,
    ) -> Self {
        debug_assert!(allocated_len > 0);

        Self {
            ptr,
            allocated_len,
            len: allocated_len,
        }
    }

    /// Releases ownership of the allocation to the caller, returning the pointer and
    /// the allocated slot count. Returns `None` if there is no allocation.
    pub(crate) fn into_raw_parts(self) -> Option<(NonNull<MaybeUninit<T>>, usize)> {
        let this = ManuallyDrop::new(self);

        if this.allocated_len == 0 {
            return None;
        }

        Some((this.ptr, this.allocated_len))
    }

    /// The number of visible slots in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer has zero visible slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of slots in the allocation backing the buffer, including any slots hidden
    /// by [`truncate()`][Self::truncate].
    #[must_use]
    pub fn allocated_len(&self) -> usize {
        self.allocated_len
    }

    /// Hides all slots at index `len` and beyond. Has no effect if `len` is not less than
    /// the current visible length.
    ///
    /// There is no way to make hidden slots visible again.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Pointer to the first slot. Valid for reads and writes of [`len()`][Self::len] slots.
    ///
    /// For an empty buffer this is a dangling, well-aligned pointer.
    #[must_use]
    pub fn as_ptr(&self) -> *const MaybeUninit<T> {
        self.ptr.as_ptr()
    }

    /// Pointer to the first slot. Valid for reads and writes of [`len()`][Self::len] slots.
    ///
    /// For an empty buffer this is a dangling, well-aligned pointer.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut MaybeUninit<T> {
        self.ptr.as_ptr()
    }

    /// The visible slots of the buffer.
    #[must_use]
    pub fn as_uninit_slice(&self) -> &[MaybeUninit<T>] {
        // SAFETY: The pointer is valid for `len` slots (or dangling and aligned with `len`
        // zero) and `MaybeUninit` has no validity requirements on its contents.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The visible slots of the buffer.
    #[must_use]
    pub fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        // SAFETY: As in `as_uninit_slice()`, plus we hold the only handle to the allocation.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for RentedBuffer<T> {
    fn drop(&mut self) {
        if self.allocated_len == 0 {
            return;
        }

        let layout = Layout::array::<T>(self.allocated_len)
            .expect("layout was already calculated successfully when the buffer was allocated");

        // SAFETY: The layout must match between alloc and dealloc. It does, as we own an
        // allocation of `allocated_len` items of `T`.
        unsafe {
            dealloc(self.ptr.as_ptr().cast(), layout);
        }
    }
}

impl<T> fmt::Debug for RentedBuffer<T> {
    #[cfg_attr(test, mutants::skip)] // Debug output is informational, not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("allocated_len", &self.allocated_len)
            .finish()
    }
}

// SAFETY: The buffer owns its allocation exclusively, the same as `Box<[MaybeUninit<T>]>`,
// so it can move between threads whenever `T` could.
unsafe impl<T: Send> Send for RentedBuffer<T> {}

// SAFETY: Shared access only exposes `&[MaybeUninit<T>]`, the same as `Box<[MaybeUninit<T>]>`.
unsafe impl<T: Sync> Sync for RentedBuffer<T> {}
