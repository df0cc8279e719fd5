/// Determines how the pool turns a requested buffer length into a granted buffer length.
///
/// Rounding requests up to a small set of lengths means more returned buffers can satisfy
/// future requests, at the cost of some unused slots in each buffer.
///
/// # Examples
///
/// ```
/// use buffer_pool::{BufferPool, Sizing};
///
/// let pool = BufferPool::builder().sizing(Sizing::Exact).build();
///
/// let buffer = pool.rent::<u16>(10);
/// assert_eq!(buffer.len(), 10);
/// # pool.return_buffer(buffer);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum Sizing {
    /// Requests are rounded up to the next power of two. This is the default.
    #[default]
    PowerOfTwo,

    /// Requests are granted with exactly the requested length.
    Exact,
}

impl Sizing {
    /// # Panics
    ///
    /// Panics if the rounded length does not fit in `usize`.
    #[must_use]
    pub(crate) fn granted_len(self, requested_len: usize) -> usize {
        match self {
            Self::PowerOfTwo => requested_len
                .checked_next_power_of_two()
                .expect("requested buffer length is too large to round up to a power of two"),
            Self::Exact => requested_len,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_rounds_up() {
        assert_eq!(Sizing::PowerOfTwo.granted_len(1), 1);
        assert_eq!(Sizing::PowerOfTwo.granted_len(2), 2);
        assert_eq!(Sizing::PowerOfTwo.granted_len(3), 4);
        assert_eq!(Sizing::PowerOfTwo.granted_len(10), 16);
        assert_eq!(Sizing::PowerOfTwo.granted_len(64), 64);
    }

    #[test]
    fn exact_is_identity() {
        assert_eq!(Sizing::Exact.granted_len(1), 1);
        assert_eq!(Sizing::Exact.granted_len(3), 3);
        assert_eq!(Sizing::Exact.granted_len(10), 10);
    }

    #[test]
    #[should_panic]
    fn power_of_two_overflow_panics() {
        _ = Sizing::PowerOfTwo.granted_len(usize::MAX);
    }

    #[test]
    fn default_is_power_of_two() {
        assert_eq!(Sizing::default(), Sizing::PowerOfTwo);
    }
}
