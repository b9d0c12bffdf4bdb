//! Error types for storage operations.

use deltadoc_codec::CodecError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A document with the same `_id` already exists.
    #[error("duplicate key in collection '{collection}': _id {id}")]
    DuplicateKey {
        /// Collection name.
        collection: String,
        /// Rendered `_id` value.
        id: String,
    },

    /// An update operator cannot be applied to the stored value.
    #[error("cannot apply {operator} to field '{path}': {message}")]
    OperatorMisapplied {
        /// Wire name of the operator.
        operator: String,
        /// Target path.
        path: String,
        /// Why the operator does not apply.
        message: String,
    },

    /// The document handed to the store is not a map.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Path handling failed.
    #[error("path error: {0}")]
    Codec(#[from] CodecError),

    /// Opaque failure reported by a store transport.
    #[error("store error: {message}")]
    Backend {
        /// Transport-provided description.
        message: String,
    },
}

impl StorageError {
    /// Create an operator misapplied error.
    pub fn operator_misapplied(
        operator: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::OperatorMisapplied {
            operator: operator.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
