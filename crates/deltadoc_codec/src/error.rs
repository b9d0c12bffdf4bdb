//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while parsing paths or editing documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A dotted path could not be parsed.
    #[error("invalid path '{path}': {message}")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// A path walked through a value that cannot hold children.
    #[error("cannot traverse '{path}': value is not a map or array")]
    NotAContainer {
        /// The path prefix that resolved to a scalar.
        path: String,
    },

    /// An index segment was used against a map or a key against an array.
    #[error("segment '{segment}' does not address a child of '{path}'")]
    SegmentMismatch {
        /// The parent path.
        path: String,
        /// The segment that could not be applied.
        segment: String,
    },
}

impl CodecError {
    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not-a-container error.
    pub fn not_a_container(path: impl Into<String>) -> Self {
        Self::NotAContainer { path: path.into() }
    }

    /// Create a segment mismatch error.
    pub fn segment_mismatch(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::SegmentMismatch {
            path: path.into(),
            segment: segment.into(),
        }
    }
}
