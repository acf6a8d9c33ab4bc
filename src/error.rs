use std::alloc::Layout;

use thiserror::Error;

/// Errors reported by fallible container operations.
///
/// A failed call leaves the container as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Checked element access past the end.
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Length at the time of the request.
        len: usize,
    },

    /// Key-based erase of a key that is not in the map.
    #[error("key is not present in the map")]
    KeyNotFound,

    /// Requested element count exceeds what the element type can ever occupy.
    #[error("requested length {requested} exceeds maximum {max}")]
    LengthExceeded {
        /// Requested element count.
        requested: usize,
        /// Value of `max_size()` for the element type.
        max: usize,
    },

    /// The allocator could not supply storage.
    #[error("memory allocation of {} bytes failed", layout.size())]
    AllocFailed {
        /// Layout of the refused request.
        layout: Layout,
    },
}

impl ContainerError {
    /// True for the out-of-range class: bad index or missing key.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. } | Self::KeyNotFound)
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Abort path for std-shaped methods that have no way to report failure.
#[cold]
#[track_caller]
pub(crate) fn failed(err: ContainerError) -> ! {
    match err {
        ContainerError::AllocFailed { layout } => std::alloc::handle_alloc_error(layout),
        other => panic!("{other}"),
    }
}

#[test]
fn out_of_range_class() {
    assert!(ContainerError::KeyNotFound.is_out_of_range());
    assert!(ContainerError::IndexOutOfRange { index: 3, len: 3 }.is_out_of_range());
    assert!(!ContainerError::LengthExceeded {
        requested: 10,
        max: 5
    }
    .is_out_of_range());
    assert_eq!(
        ContainerError::IndexOutOfRange { index: 3, len: 3 }.to_string(),
        "index 3 is out of range for length 3"
    );
}
