//! Error types and result types for repository operations.
//!
//! Every fallible operation in this crate returns [`DocumentStoreResult<T>`]. Errors are
//! surfaced to the immediate caller and are never logged, swallowed or retried here.

use bson::error::Error as BsonError;
use std::error::Error as StdError;
use thiserror::Error;

/// A boxed, thread-safe error coming from a store backend.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when interacting with a repository.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A dynamic filter or order string is syntactically invalid.
    ///
    /// `position` is the byte offset in `input` where parsing failed.
    #[error("Parse error at position {position} in {input:?}: {message}")]
    Parse {
        input: String,
        position: usize,
        message: String,
    },
    /// A referenced field does not exist on the document shape.
    #[error("Field {field:?} cannot be resolved on document {document}")]
    FieldResolution { field: String, document: String },
    /// A caller contract violation, such as a page number below 1.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The store rejected or failed a write. The native error is kept as the source.
    #[error("Write error: {0}")]
    Write(#[source] BoxError),
    /// The store failed a read or an administrative operation.
    #[error("Backend error: {0}")]
    Backend(#[source] BoxError),
    /// Serialization/deserialization error when converting between documents and BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl DocumentStoreError {
    pub(crate) fn parse(input: &str, position: usize, message: impl Into<String>) -> Self {
        DocumentStoreError::Parse {
            input: input.to_string(),
            position,
            message: message.into(),
        }
    }

    pub(crate) fn unresolved(field: impl Into<String>, document: &str) -> Self {
        DocumentStoreError::FieldResolution {
            field: field.into(),
            document: document.to_string(),
        }
    }

    /// Wraps a native store error raised during a write.
    pub fn write(err: impl Into<BoxError>) -> Self {
        DocumentStoreError::Write(err.into())
    }

    /// Wraps a native store error raised during a read.
    pub fn backend(err: impl Into<BoxError>) -> Self {
        DocumentStoreError::Backend(err.into())
    }

    /// Returns `true` for errors raised by the store during a write.
    pub fn is_write(&self) -> bool {
        matches!(self, DocumentStoreError::Write(_))
    }
}

/// A specialized `Result` type for repository operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
