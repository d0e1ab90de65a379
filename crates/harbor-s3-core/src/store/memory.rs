//! In-memory store implementations.
//!
//! [`InMemoryMetadataStore`] keeps every record in [`DashMap`]s; the
//! session compare-and-set runs under the map's entry lock.
//! [`InMemoryByteStore`] keeps each payload in its own `parking_lot::RwLock`
//! so concurrent writers to different payloads never contend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;

use super::{ByteStore, ChunkIter, MetadataStore};
use crate::error::StoreError;
use crate::state::{Bucket, ObjectEntry, PartEntry, UploadSession, UploadState};

/// Chunk size used by [`InMemoryByteStore::read_chunks`] unless overridden.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Metadata kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    buckets: DashMap<String, Bucket>,
    objects: DashMap<(u64, String), ObjectEntry>,
    uploads: DashMap<String, UploadSession>,
    parts: DashMap<String, BTreeMap<u32, PartEntry>>,
    next_id: AtomicU64,
}

impl InMemoryMetadataStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get_bucket(&self, name: &str) -> Result<Option<Bucket>, StoreError> {
        Ok(self.buckets.get(name).map(|b| b.clone()))
    }

    fn create_bucket(&self, name: &str, owner: &str, pool: &str) -> Result<Bucket, StoreError> {
        match self.buckets.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(name.to_owned())),
            Entry::Vacant(slot) => {
                let bucket = Bucket::new(self.allocate_id(), name, owner, pool);
                slot.insert(bucket.clone());
                Ok(bucket)
            }
        }
    }

    fn get_object(&self, bucket_id: u64, key: &str) -> Result<Option<ObjectEntry>, StoreError> {
        Ok(self
            .objects
            .get(&(bucket_id, key.to_owned()))
            .map(|o| o.clone()))
    }

    fn get_or_create_object(
        &self,
        bucket_id: u64,
        key: &str,
    ) -> Result<(ObjectEntry, bool), StoreError> {
        match self.objects.entry((bucket_id, key.to_owned())) {
            Entry::Occupied(existing) => Ok((existing.get().clone(), false)),
            Entry::Vacant(slot) => {
                let object = ObjectEntry::new(self.allocate_id(), key);
                slot.insert(object.clone());
                Ok((object, true))
            }
        }
    }

    fn update_object(&self, bucket_id: u64, object: &ObjectEntry) -> Result<(), StoreError> {
        let mut entry = self
            .objects
            .get_mut(&(bucket_id, object.key.clone()))
            .ok_or_else(|| StoreError::NotFound(format!("object {}", object.key)))?;
        *entry = object.clone();
        Ok(())
    }

    fn create_upload(&self, session: &UploadSession) -> Result<(), StoreError> {
        match self.uploads.entry(session.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(session.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
                Ok(())
            }
        }
    }

    fn get_upload(&self, upload_id: &str) -> Result<Option<UploadSession>, StoreError> {
        Ok(self.uploads.get(upload_id).map(|s| s.clone()))
    }

    fn transition_upload(
        &self,
        upload_id: &str,
        from: UploadState,
        to: UploadState,
    ) -> Result<bool, StoreError> {
        let mut session = self
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::NotFound(format!("upload {upload_id}")))?;
        if session.state != from {
            return Ok(false);
        }
        session.state = to;
        Ok(true)
    }

    fn set_upload_state(&self, upload_id: &str, state: UploadState) -> Result<(), StoreError> {
        let mut session = self
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::NotFound(format!("upload {upload_id}")))?;
        session.state = state;
        Ok(())
    }

    fn delete_upload(&self, upload_id: &str) -> Result<(), StoreError> {
        self.uploads
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("upload {upload_id}")))
    }

    fn put_part(&self, part: &PartEntry) -> Result<Option<PartEntry>, StoreError> {
        Ok(self
            .parts
            .entry(part.upload_id.clone())
            .or_default()
            .insert(part.part_number, part.clone()))
    }

    fn list_parts(&self, upload_id: &str) -> Result<Vec<PartEntry>, StoreError> {
        Ok(self
            .parts
            .get(upload_id)
            .map(|parts| parts.values().cloned().collect())
            .unwrap_or_default())
    }

    fn update_part(&self, part: &PartEntry) -> Result<(), StoreError> {
        let mut parts = self
            .parts
            .get_mut(&part.upload_id)
            .ok_or_else(|| StoreError::NotFound(format!("upload {}", part.upload_id)))?;
        let slot = parts.get_mut(&part.part_number).ok_or_else(|| {
            StoreError::NotFound(format!("part {} of {}", part.part_number, part.upload_id))
        })?;
        *slot = part.clone();
        Ok(())
    }

    fn delete_part(&self, upload_id: &str, part_number: u32) -> Result<(), StoreError> {
        let removed = self
            .parts
            .get_mut(upload_id)
            .and_then(|mut parts| parts.remove(&part_number));
        self.parts.remove_if(upload_id, |_, parts| parts.is_empty());
        removed
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("part {part_number} of {upload_id}")))
    }
}

/// Payload bytes kept in process memory, keyed by `(pool, key)`.
#[derive(Debug)]
pub struct InMemoryByteStore {
    blobs: DashMap<(String, String), Arc<RwLock<Vec<u8>>>>,
    chunk_size: usize,
}

impl Default for InMemoryByteStore {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

impl InMemoryByteStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose reads yield chunks of at most `chunk_size` bytes.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            blobs: DashMap::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Whether a payload exists at `pool`/`key`.
    #[must_use]
    pub fn contains(&self, pool: &str, key: &str) -> bool {
        self.blobs.contains_key(&(pool.to_owned(), key.to_owned()))
    }

    fn blob(&self, pool: &str, key: &str) -> Result<Arc<RwLock<Vec<u8>>>, StoreError> {
        self.blobs
            .get(&(pool.to_owned(), key.to_owned()))
            .map(|b| Arc::clone(&b))
            .ok_or_else(|| StoreError::NotFound(format!("{pool}/{key}")))
    }
}

fn to_index(value: u64) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::Backend(format!("offset {value} out of range")))
}

impl ByteStore for InMemoryByteStore {
    fn write_at(&self, pool: &str, key: &str, offset: u64, data: &[u8]) -> Result<(), StoreError> {
        let start = to_index(offset)?;
        let end = start + data.len();
        let blob = Arc::clone(
            &self
                .blobs
                .entry((pool.to_owned(), key.to_owned()))
                .or_default(),
        );
        let mut bytes = blob.write();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn read_chunks(&self, pool: &str, key: &str) -> Result<ChunkIter, StoreError> {
        let snapshot = Bytes::copy_from_slice(&self.blob(pool, key)?.read());
        let chunk_size = self.chunk_size;
        let len = snapshot.len();
        Ok(Box::new((0..len).step_by(chunk_size).map(move |start| {
            Ok(snapshot.slice(start..(start + chunk_size).min(len)))
        })))
    }

    fn truncate(&self, pool: &str, key: &str, size: u64) -> Result<(), StoreError> {
        let size = to_index(size)?;
        self.blob(pool, key)?.write().resize(size, 0);
        Ok(())
    }

    fn delete(&self, pool: &str, key: &str) -> Result<(), StoreError> {
        self.blobs
            .remove(&(pool.to_owned(), key.to_owned()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("{pool}/{key}")))
    }
}
