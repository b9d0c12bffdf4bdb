//! Error types for deltadoc core.

use indexmap::IndexMap;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by document operations.
///
/// Everything except [`CoreError::Storage`] is a usage or validation error
/// that the caller can recover from.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage transport error, passed through unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] deltadoc_storage::StorageError),

    /// Malformed dotted path.
    #[error("path error: {0}")]
    Codec(#[from] deltadoc_codec::CodecError),

    /// The path is not declared by the model's schema.
    #[error("field '{path}' does not exist")]
    UnknownField {
        /// The rejected path.
        path: String,
    },

    /// `pop` on a path that does not hold an array.
    #[error("field '{path}' is not an array")]
    NotAnArray {
        /// The rejected path.
        path: String,
    },

    /// `inc` on a field whose current value is not a number.
    #[error("cannot apply $inc modifier to non-number in field '{path}'")]
    NonNumericTarget {
        /// The rejected path.
        path: String,
    },

    /// `inc` with an operand that is not a number.
    #[error("cannot apply $inc modifier with non-numeric values in field '{path}'")]
    NonNumericOperand {
        /// The rejected path.
        path: String,
    },

    /// Operator name outside the fixed slot set.
    #[error("the atomic operation '{name}' does not exist")]
    UnknownOperator {
        /// The requested name.
        name: String,
    },

    /// Operation not permitted in the document's current state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the operation is refused.
        message: String,
    },

    /// The rule engine rejected the document.
    #[error("validation failed: {}", summarize(.errors))]
    ValidationFailed {
        /// Error message per failing path.
        errors: IndexMap<String, String>,
    },

    /// Malformed schema, alias or rule declaration.
    #[error("schema error: {message}")]
    Schema {
        /// Description of the problem.
        message: String,
    },

    /// A model refers to a filter that is not registered.
    #[error("unknown filter '{name}'")]
    UnknownFilter {
        /// The requested filter name.
        name: String,
    },
}

fn summarize(errors: &IndexMap<String, String>) -> String {
    errors.values().cloned().collect::<Vec<_>>().join("; ")
}

impl CoreError {
    /// Create an unknown field error.
    pub fn unknown_field(path: impl Into<String>) -> Self {
        Self::UnknownField { path: path.into() }
    }

    /// Create a not-an-array error.
    pub fn not_an_array(path: impl Into<String>) -> Self {
        Self::NotAnArray { path: path.into() }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }
}
