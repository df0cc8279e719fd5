use std::alloc::{Layout, alloc, dealloc, handle_alloc_error};
use std::any::type_name;
use std::fmt;
use std::mem::{self, MaybeUninit};
use std::ptr::NonNull;
use std::sync::LazyLock;

use foldhash::HashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{BufferPoolBuilder, PoolStats, RentedBuffer, Sizing};

static SHARED: LazyLock<BufferPool> = LazyLock::new(BufferPool::new);

/// A thread-safe pool of reusable buffers of uninitialized slots.
///
/// Callers [rent][Self::rent] a buffer of at least some length and later
/// [return][Self::return_buffer] it, at which point it becomes available to the next caller
/// that rents a buffer of the same shape. The pool makes no promises about which buffer a
/// rent receives or about the ordering of rents and returns made from different threads.
///
/// # Buckets
///
/// Returned buffers are parked in buckets keyed by the memory layout of one item and the
/// allocated length. Buffers are reused across item types that share a layout.
///
/// # Thread safety
///
/// The pool is `Send` and `Sync`. All bookkeeping is protected by a single internal lock that
/// is held only for the duration of the bookkeeping, never during memory allocation or
/// deallocation.
///
/// # Example
///
/// ```rust
/// use buffer_pool::BufferPool;
///
/// let pool = BufferPool::shared();
///
/// let buffer = pool.rent::<String>(3);
/// assert!(buffer.len() >= 3);
///
/// pool.return_buffer(buffer);
/// ```
pub struct BufferPool {
    state: Mutex<PoolState>,

    sizing: Sizing,
    retain_per_bucket: usize,
    max_pooled_bytes: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    buckets: HashMap<BucketKey, Vec<ParkedBuffer>>,
    stats: PoolStats,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
struct BucketKey {
    item_layout: Layout,
    len: usize,
}

impl BucketKey {
    fn of<T>(len: usize) -> Self {
        Self {
            item_layout: Layout::new::<T>(),
            len,
        }
    }

    fn buffer_layout(self) -> Layout {
        let size = self
            .item_layout
            .size()
            .checked_mul(self.len)
            .expect("guarded by successful allocation of a buffer with this key");

        // Item layouts are already padded to their alignment, so this matches `Layout::array`.
        Layout::from_size_align(size, self.item_layout.align())
            .expect("guarded by successful allocation of a buffer with this key")
    }
}

/// Raw memory parked in the pool. Contains no live values.
#[derive(Debug, Eq, PartialEq)]
struct ParkedBuffer {
    ptr: NonNull<u8>,
}

// SAFETY: A parked buffer is plain memory without any values in it, owned by the pool alone.
unsafe impl Send for ParkedBuffer {}

impl BufferPool {
    pub(crate) fn new_inner(
        sizing: Sizing,
        retain_per_bucket: usize,
        max_pooled_bytes: usize,
    ) -> Self {
        debug!(
            ?sizing,
            retain_per_bucket, max_pooled_bytes, "creating buffer pool"
        );

        Self {
            state: Mutex::new(PoolState::default()),
            sizing,
            retain_per_bucket,
            max_pooled_bytes,
        }
    }

    /// Creates a new [`BufferPool`] with the default configuration.
    ///
    /// Most code should use the process-wide [`shared()`][Self::shared] pool instead, so that
    /// buffers are reused across all users. A private pool is useful when isolation matters,
    /// for example to observe [`stats()`][Self::stats] without interference.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`BufferPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    pub fn builder() -> BufferPoolBuilder {
        BufferPoolBuilder::new()
    }

    /// The process-wide pool, created on first use with the default configuration.
    #[must_use]
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// Rents a buffer with at least `min_len` uninitialized slots for items of type `T`.
    ///
    /// The granted length is determined by the pool's [`Sizing`] and may exceed `min_len`.
    /// A `min_len` of zero yields an empty buffer without touching the pool.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if the buffer size would exceed `isize::MAX` bytes.
    #[must_use]
    pub fn rent<T>(&self, min_len: usize) -> RentedBuffer<T> {
        assert!(
            size_of::<T>() > 0,
            "BufferPool cannot rent buffers for zero-sized items"
        );

        if min_len == 0 {
            return RentedBuffer::empty();
        }

        let len = self.sizing.granted_len(min_len);
        let key = BucketKey::of::<T>(len);

        let parked = {
            let mut state = self.state.lock();
            state.stats.rented = state.stats.rented.saturating_add(1);

            let parked = state.buckets.get_mut(&key).and_then(Vec::pop);

            if parked.is_some() {
                state.stats.retained = state
                    .stats
                    .retained
                    .checked_sub(1)
                    .expect("a buffer was parked so the retained count must be non-zero");
            } else {
                state.stats.allocated = state.stats.allocated.saturating_add(1);
            }

            parked
        };

        let ptr = parked.map_or_else(
            || {
                trace!(item = type_name::<T>(), len, "allocating new buffer");
                allocate::<T>(len).cast::<u8>()
            },
            |parked| {
                trace!(item = type_name::<T>(), len, "reusing parked buffer");
                parked.ptr
            },
        );

        // SAFETY: The pointer is either freshly allocated with the layout of `[T; len]` or a
        // parked buffer from the bucket with the same item layout and length.
        unsafe { RentedBuffer::from_raw_parts(ptr.cast(), len) }
    }

    /// Returns a rented buffer to the pool so it can be reused.
    ///
    /// The buffer may have been rented from any pool. The pool does not drop any values in
    /// the buffer; it is treated as uninitialized memory from here on.
    ///
    /// If the bucket for this buffer is already full or the buffer is larger than the pool's
    /// size limit, the memory is freed instead.
    pub fn return_buffer<T>(&self, buffer: RentedBuffer<T>) {
        let Some((ptr, len)) = buffer.into_raw_parts() else {
            return;
        };

        let key = BucketKey::of::<T>(len);
        let ptr = ptr.cast::<u8>();
        let too_large = key.buffer_layout().size() > self.max_pooled_bytes;

        {
            let mut state = self.state.lock();
            state.stats.returned = state.stats.returned.saturating_add(1);

            let bucket = state.buckets.entry(key).or_default();

            if !too_large && bucket.len() < self.retain_per_bucket {
                debug_assert!(
                    !bucket.iter().any(|parked| parked.ptr == ptr),
                    "buffer returned to the pool while already parked in it"
                );

                bucket.push(ParkedBuffer { ptr });

                state.stats.retained = state
                    .stats
                    .retained
                    .checked_add(1)
                    .expect("cannot retain more buffers than fit in virtual memory");

                trace!(item = type_name::<T>(), len, "parked returned buffer");
                return;
            }

            state.stats.discarded = state.stats.discarded.saturating_add(1);
        }

        debug!(
            item = type_name::<T>(),
            len, too_large, "freeing returned buffer instead of parking it"
        );

        // SAFETY: The buffer was allocated with exactly this layout and nothing else refers
        // to it, as we consumed the only handle.
        unsafe {
            dealloc(ptr.as_ptr(), key.buffer_layout());
        }
    }

    /// Frees every buffer currently parked in the pool.
    ///
    /// Buffers that are rented out at the time of the call are unaffected and may still be
    /// returned afterwards.
    pub fn trim(&self) {
        let buckets = {
            let mut state = self.state.lock();
            state.stats.retained = 0;
            mem::take(&mut state.buckets)
        };

        let freed = free_buckets(buckets);

        debug!(freed, "trimmed buffer pool");
    }

    /// A snapshot of the pool's activity counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        free_buckets(mem::take(&mut self.state.get_mut().buckets));
    }
}

impl fmt::Debug for BufferPool {
    #[cfg_attr(test, mutants::skip)] // Debug output is informational, not part of the contract.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("sizing", &self.sizing)
            .field("retain_per_bucket", &self.retain_per_bucket)
            .field("max_pooled_bytes", &self.max_pooled_bytes)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn allocate<T>(len: usize) -> NonNull<MaybeUninit<T>> {
    let layout = Layout::array::<T>(len).expect("buffer size must not exceed isize::MAX bytes");

    // SAFETY: The layout has non-zero size because `T` is not zero-sized and `len` is
    // non-zero, both guarded by `rent()`.
    let ptr = unsafe { alloc(layout) };

    NonNull::new(ptr.cast()).unwrap_or_else(|| handle_alloc_error(layout))
}

/// Returns how many buffers were freed.
fn free_buckets(buckets: HashMap<BucketKey, Vec<ParkedBuffer>>) -> usize {
    let mut freed: usize = 0;

    for (key, bucket) in buckets {
        let layout = key.buffer_layout();

        for parked in bucket {
            // SAFETY: Every parked buffer in a bucket was allocated with the bucket's layout
            // and is owned by the pool alone.
            unsafe {
                dealloc(parked.ptr.as_ptr(), layout);
            }

            freed = freed.saturating_add(1);
        }
    }

    freed
}
