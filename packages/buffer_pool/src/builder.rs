use crate::{BufferPool, Sizing};

/// By default, each bucket parks this many buffers for reuse before freeing further returns.
pub(crate) const DEFAULT_RETAIN_PER_BUCKET: usize = 32;

/// By default, buffers larger than this are freed on return instead of parked.
pub(crate) const DEFAULT_MAX_POOLED_BYTES: usize = 1024 * 1024;

/// Builder for creating an instance of [`BufferPool`].
///
/// You only need to use this builder if you want to customize the pool configuration.
/// The default configuration used by [`BufferPool::new()`][1] and by the shared pool is
/// sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use buffer_pool::{BufferPool, Sizing};
///
/// let pool = BufferPool::builder()
///     .sizing(Sizing::PowerOfTwo)
///     .retain_per_bucket(8)
///     .max_pooled_bytes(64 * 1024)
///     .build();
/// ```
///
/// [1]: BufferPool::new
#[derive(Debug)]
#[must_use]
pub struct BufferPoolBuilder {
    sizing: Sizing,
    retain_per_bucket: usize,
    max_pooled_bytes: usize,
}

impl BufferPoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            sizing: Sizing::default(),
            retain_per_bucket: DEFAULT_RETAIN_PER_BUCKET,
            max_pooled_bytes: DEFAULT_MAX_POOLED_BYTES,
        }
    }

    /// Sets the [sizing strategy][Sizing] that turns requested lengths into granted lengths.
    pub fn sizing(mut self, sizing: Sizing) -> Self {
        self.sizing = sizing;
        self
    }

    /// Sets how many returned buffers the pool parks per bucket. A bucket holds buffers of one
    /// item layout and one length. Buffers returned to a full bucket are freed.
    ///
    /// Zero is valid and turns the pool into a plain allocator that never reuses memory.
    pub fn retain_per_bucket(mut self, count: usize) -> Self {
        self.retain_per_bucket = count;
        self
    }

    /// Sets the size in bytes of the largest buffer the pool will park for reuse. Larger
    /// buffers can still be rented but are freed when returned.
    pub fn max_pooled_bytes(mut self, bytes: usize) -> Self {
        self.max_pooled_bytes = bytes;
        self
    }

    /// Builds the buffer pool with the specified configuration.
    #[must_use]
    pub fn build(self) -> BufferPool {
        BufferPool::new_inner(self.sizing, self.retain_per_bucket, self.max_pooled_bytes)
    }
}
