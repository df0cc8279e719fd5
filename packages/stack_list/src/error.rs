use thiserror::Error;

/// Errors that can occur when operating on a [`StackList`][crate::StackList].
///
/// Both kinds signal a programming error at the call site. The list is left unchanged
/// whenever an operation returns an error.
#[derive(Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided an argument that can never be valid, such as a negative capacity.
    #[error("invalid argument: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// The caller provided an index outside the range that is valid for the operation,
    /// given the number of items currently in the list.
    #[error("index {index} is out of range for a list of {len} items")]
    IndexOutOfRange {
        /// The index that was rejected.
        index: usize,

        /// The number of items in the list at the time of the call.
        len: usize,
    },
}

/// A specialized `Result` type for list operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn index_out_of_range_names_index_and_len() {
        let error = Error::IndexOutOfRange { index: 7, len: 3 };

        assert_eq!(
            error.to_string(),
            "index 7 is out of range for a list of 3 items"
        );
    }

    #[test]
    fn invalid_argument_includes_problem() {
        let error = Error::InvalidArgument {
            problem: "capacity must not be negative".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "invalid argument: capacity must not be negative"
        );
    }
}
