//! Failure-injecting store wrappers for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{ByteStore, ChunkIter, InMemoryByteStore, InMemoryMetadataStore, MetadataStore};
use crate::error::StoreError;
use crate::state::{Bucket, ObjectEntry, PartEntry, UploadSession, UploadState};

fn injected(what: &str) -> StoreError {
    StoreError::Backend(format!("injected failure: {what}"))
}

/// Take one unit from a failure budget, returning whether the call should fail.
fn consume(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Metadata store whose part deletes, object updates, and session deletes can fail.
#[derive(Debug, Default)]
pub(crate) struct FaultyMetadataStore {
    pub(crate) inner: InMemoryMetadataStore,
    /// Part numbers whose metadata deletion always fails.
    pub(crate) failing_part_deletes: Mutex<HashSet<u32>>,
    pub(crate) part_delete_calls: AtomicUsize,
    pub(crate) fail_update_object: AtomicBool,
    pub(crate) fail_part_updates: AtomicUsize,
    pub(crate) fail_delete_upload: AtomicUsize,
}

impl FaultyMetadataStore {
    pub(crate) fn fail_part_deletes(&self, numbers: impl IntoIterator<Item = u32>) {
        self.failing_part_deletes.lock().extend(numbers);
    }
}

impl MetadataStore for FaultyMetadataStore {
    fn get_bucket(&self, name: &str) -> Result<Option<Bucket>, StoreError> {
        self.inner.get_bucket(name)
    }

    fn create_bucket(&self, name: &str, owner: &str, pool: &str) -> Result<Bucket, StoreError> {
        self.inner.create_bucket(name, owner, pool)
    }

    fn get_object(&self, bucket_id: u64, key: &str) -> Result<Option<ObjectEntry>, StoreError> {
        self.inner.get_object(bucket_id, key)
    }

    fn get_or_create_object(
        &self,
        bucket_id: u64,
        key: &str,
    ) -> Result<(ObjectEntry, bool), StoreError> {
        self.inner.get_or_create_object(bucket_id, key)
    }

    fn update_object(&self, bucket_id: u64, object: &ObjectEntry) -> Result<(), StoreError> {
        if self.fail_update_object.load(Ordering::SeqCst) {
            return Err(injected("update_object"));
        }
        self.inner.update_object(bucket_id, object)
    }

    fn create_upload(&self, session: &UploadSession) -> Result<(), StoreError> {
        self.inner.create_upload(session)
    }

    fn get_upload(&self, upload_id: &str) -> Result<Option<UploadSession>, StoreError> {
        self.inner.get_upload(upload_id)
    }

    fn transition_upload(
        &self,
        upload_id: &str,
        from: UploadState,
        to: UploadState,
    ) -> Result<bool, StoreError> {
        self.inner.transition_upload(upload_id, from, to)
    }

    fn set_upload_state(&self, upload_id: &str, state: UploadState) -> Result<(), StoreError> {
        self.inner.set_upload_state(upload_id, state)
    }

    fn delete_upload(&self, upload_id: &str) -> Result<(), StoreError> {
        if consume(&self.fail_delete_upload) {
            return Err(injected("delete_upload"));
        }
        self.inner.delete_upload(upload_id)
    }

    fn put_part(&self, part: &PartEntry) -> Result<Option<PartEntry>, StoreError> {
        self.inner.put_part(part)
    }

    fn list_parts(&self, upload_id: &str) -> Result<Vec<PartEntry>, StoreError> {
        self.inner.list_parts(upload_id)
    }

    fn update_part(&self, part: &PartEntry) -> Result<(), StoreError> {
        if consume(&self.fail_part_updates) {
            return Err(injected("update_part"));
        }
        self.inner.update_part(part)
    }

    fn delete_part(&self, upload_id: &str, part_number: u32) -> Result<(), StoreError> {
        self.part_delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_part_deletes.lock().contains(&part_number) {
            return Err(injected("delete_part"));
        }
        self.inner.delete_part(upload_id, part_number)
    }
}

/// Byte store whose writes and deletes can fail.
#[derive(Debug, Default)]
pub(crate) struct FaultyByteStore {
    pub(crate) inner: InMemoryByteStore,
    /// Number of upcoming `write_at` calls that fail.
    pub(crate) fail_writes: AtomicUsize,
    /// Keys whose deletion always fails.
    pub(crate) failing_deletes: Mutex<HashSet<String>>,
    pub(crate) delete_calls: AtomicUsize,
    pub(crate) write_calls: AtomicUsize,
}

impl ByteStore for FaultyByteStore {
    fn write_at(&self, pool: &str, key: &str, offset: u64, data: &[u8]) -> Result<(), StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if consume(&self.fail_writes) {
            return Err(injected("write_at"));
        }
        self.inner.write_at(pool, key, offset, data)
    }

    fn read_chunks(&self, pool: &str, key: &str) -> Result<ChunkIter, StoreError> {
        self.inner.read_chunks(pool, key)
    }

    fn truncate(&self, pool: &str, key: &str, size: u64) -> Result<(), StoreError> {
        self.inner.truncate(pool, key, size)
    }

    fn delete(&self, pool: &str, key: &str) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.lock().contains(key) {
            return Err(injected("delete"));
        }
        self.inner.delete(pool, key)
    }
}
