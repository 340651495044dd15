use std::error::Error as StdError;

use thiserror::Error;

/// Errors that can occur when creating or operating a [`FixedPool`][crate::FixedPool].
///
/// Running out of free slots is not an error - [`acquire()`][crate::FixedPool::acquire]
/// simply returns `None` in that case.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided a pool configuration that cannot be satisfied.
    #[error("invalid pool configuration: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// The backing storage for the pool could not be obtained.
    #[error("failed to allocate storage for {capacity} slots of {item_type}")]
    AllocationFailed {
        /// The capacity that was requested for the pool.
        capacity: usize,

        /// Name of the type whose storage could not be allocated.
        item_type: &'static str,
    },

    /// The value factory failed while constructing one of the slots. All slots constructed
    /// before the failing one have already been dropped when this error is returned.
    #[error("failed to construct the value for slot {slot_index}: {source}")]
    Construction {
        /// Index of the slot whose construction failed.
        slot_index: usize,

        /// The error returned by the value factory.
        source: Box<dyn StdError + Send + Sync>,
    },

    /// A slot was released while it was not checked out under the given generation.
    #[error("slot {slot_index} was released twice in checkout generation {generation}")]
    DoubleRelease {
        /// Index of the slot that was released.
        slot_index: usize,

        /// The checkout generation carried by the rejected release.
        generation: u64,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
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
    fn construction_error_exposes_source() {
        let error = Error::Construction {
            slot_index: 3,
            source: "factory ran dry".into(),
        };

        let source = error.source().expect("construction errors carry a source");
        assert_eq!(source.to_string(), "factory ran dry");
        assert!(error.to_string().contains("slot 3"));
    }

    #[test]
    fn double_release_message_names_slot_and_generation() {
        let error = Error::DoubleRelease {
            slot_index: 7,
            generation: 2,
        };

        let message = error.to_string();
        assert!(message.contains("slot 7"));
        assert!(message.contains("generation 2"));
    }
}
