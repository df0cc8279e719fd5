/// A snapshot of the activity counters of a [`BufferPool`][crate::BufferPool].
///
/// Obtained via [`BufferPool::stats()`][crate::BufferPool::stats]. The counters only ever
/// grow, except for [`retained()`][Self::retained], which reflects the current state.
///
/// Renting or returning a zero-length buffer does not touch the pool and is not counted.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    pub(crate) rented: u64,
    pub(crate) returned: u64,
    pub(crate) allocated: u64,
    pub(crate) discarded: u64,
    pub(crate) retained: usize,
}

impl PoolStats {
    /// How many buffers have been rented from the pool.
    #[must_use]
    pub fn rented(&self) -> u64 {
        self.rented
    }

    /// How many buffers have been returned to the pool.
    ///
    /// This includes buffers that the pool chose to free instead of retaining.
    #[must_use]
    pub fn returned(&self) -> u64 {
        self.returned
    }

    /// How many rents could not be satisfied by a retained buffer and required a fresh
    /// memory allocation.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    /// How many returned buffers were freed instead of retained, either because their bucket
    /// was full or because they exceeded the size limit for pooled buffers.
    #[must_use]
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// How many buffers the pool is holding for reuse right now.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.retained
    }

    /// How many rented buffers have not yet come back to the pool.
    ///
    /// Buffers that were dropped instead of returned remain counted here forever.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        self.rented.saturating_sub(self.returned)
    }
}
