//! Storage collaborators.
//!
//! The gateway core talks to two stores:
//!
//! - [`MetadataStore`]: buckets, objects, upload sessions, and parts.
//! - [`ByteStore`]: payload bytes addressed by `(pool, key)`.
//!
//! Both are synchronous; async callers run them on tokio's blocking pool.
//! [`memory`] provides in-memory implementations of each.

use bytes::Bytes;

use crate::error::StoreError;
use crate::state::{Bucket, ObjectEntry, PartEntry, UploadSession, UploadState};

pub mod memory;

#[cfg(test)]
pub(crate) mod faulty;

pub use memory::{InMemoryByteStore, InMemoryMetadataStore};

/// Run a store call, retrying it once if it fails.
pub(crate) fn retry_once<T>(
    what: &str,
    call: impl Fn() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    call().or_else(|first| {
        tracing::debug!(operation = what, error = %first, "retrying store call");
        call()
    })
}

/// Chunks of a stored payload, in order.
pub type ChunkIter = Box<dyn Iterator<Item = Result<Bytes, StoreError>> + Send>;

/// Bucket, object, session, and part records.
pub trait MetadataStore: Send + Sync {
    /// Look up a bucket by name.
    fn get_bucket(&self, name: &str) -> Result<Option<Bucket>, StoreError>;

    /// Create a bucket. Fails with [`StoreError::AlreadyExists`] when the name is taken.
    fn create_bucket(&self, name: &str, owner: &str, pool: &str) -> Result<Bucket, StoreError>;

    /// Look up an object by bucket id and key.
    fn get_object(&self, bucket_id: u64, key: &str) -> Result<Option<ObjectEntry>, StoreError>;

    /// Return the object at `key`, creating an empty one if needed.
    ///
    /// The flag is `true` when the object was created by this call.
    fn get_or_create_object(
        &self,
        bucket_id: u64,
        key: &str,
    ) -> Result<(ObjectEntry, bool), StoreError>;

    /// Replace an object's record in one atomic step.
    fn update_object(&self, bucket_id: u64, object: &ObjectEntry) -> Result<(), StoreError>;

    /// Insert a new upload session.
    fn create_upload(&self, session: &UploadSession) -> Result<(), StoreError>;

    /// Look up an upload session by id.
    fn get_upload(&self, upload_id: &str) -> Result<Option<UploadSession>, StoreError>;

    /// Atomically move a session from `from` to `to`.
    ///
    /// Returns `false`, changing nothing, when the session is not in `from`.
    fn transition_upload(
        &self,
        upload_id: &str,
        from: UploadState,
        to: UploadState,
    ) -> Result<bool, StoreError>;

    /// Unconditionally set a session's state.
    fn set_upload_state(&self, upload_id: &str, state: UploadState) -> Result<(), StoreError>;

    /// Delete a session record. Its parts are not touched.
    fn delete_upload(&self, upload_id: &str) -> Result<(), StoreError>;

    /// Insert or replace a part, returning the record it replaced.
    fn put_part(&self, part: &PartEntry) -> Result<Option<PartEntry>, StoreError>;

    /// All parts of an upload in ascending part-number order.
    fn list_parts(&self, upload_id: &str) -> Result<Vec<PartEntry>, StoreError>;

    /// Overwrite an existing part record.
    fn update_part(&self, part: &PartEntry) -> Result<(), StoreError>;

    /// Delete a part record.
    fn delete_part(&self, upload_id: &str, part_number: u32) -> Result<(), StoreError>;
}

/// Byte-addressable payload storage.
pub trait ByteStore: Send + Sync {
    /// Write `data` at `offset`, growing the payload as needed.
    fn write_at(&self, pool: &str, key: &str, offset: u64, data: &[u8]) -> Result<(), StoreError>;

    /// Stream a payload as a sequence of chunks.
    fn read_chunks(&self, pool: &str, key: &str) -> Result<ChunkIter, StoreError>;

    /// Shrink or extend a payload to `size` bytes.
    fn truncate(&self, pool: &str, key: &str, size: u64) -> Result<(), StoreError>;

    /// Delete a payload.
    fn delete(&self, pool: &str, key: &str) -> Result<(), StoreError>;
}
