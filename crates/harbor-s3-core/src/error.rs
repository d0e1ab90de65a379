//! Errors raised at the storage collaborator boundary.
//!
//! [`StoreError`] is what [`MetadataStore`](crate::store::MetadataStore) and
//! [`ByteStore`](crate::store::ByteStore) implementations return. Operations
//! decide how each failure surfaces; anything they do not translate becomes
//! an `InternalError` through [`StoreError::into_s3_error`].

use harbor_s3_model::error::{S3Error, S3ErrorCode};

/// A failed call into a metadata or byte store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed record or byte range does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same identity already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The backend failed to carry out the request.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Convert into an `InternalError` carrying this error as its source.
    #[must_use]
    pub fn into_s3_error(self) -> S3Error {
        S3Error::with_message(S3ErrorCode::InternalError, self.to_string()).with_source(self)
    }

    /// Whether the failure means the addressed item does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
