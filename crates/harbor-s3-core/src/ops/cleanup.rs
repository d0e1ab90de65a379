//! Part cleanup: removing part bytes and, optionally, part records.
//!
//! [`PartCleanup`] is a lazy iterator. It processes one part per step and
//! yields [`CleanupEvent::Heartbeat`] whenever the idle interval elapses, so a
//! streaming caller can keep its connection alive. The last item is
//! [`CleanupEvent::Finished`] with the parts whose records could not be
//! deleted.
//!
//! Each store call is retried once. Byte deletions that still fail are
//! accepted: the bytes become unreachable garbage but nothing refers to them.
//!
//! [`run_cleanup_with_policy`] drives the iterator under the majority rule:
//! when more than half of the records survive, the cleanup fails outright;
//! otherwise one more pass runs over the survivors and any residue is
//! tolerated.

use std::fmt;
use std::time::Duration;

use harbor_s3_model::error::S3Error;
use tracing::{debug, error, warn};

use crate::keepalive::IdleTimer;
use crate::state::PartEntry;
use crate::store::{ByteStore, MetadataStore, retry_once};

/// The stores a cleanup touches, and the pool holding the part bytes.
#[derive(Clone, Copy)]
pub struct PartStores<'a> {
    /// Part records.
    pub metadata: &'a dyn MetadataStore,
    /// Part bytes.
    pub bytes: &'a dyn ByteStore,
    /// Pool the part bytes live in.
    pub pool: &'a str,
}

impl fmt::Debug for PartStores<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartStores")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// One step of a [`PartCleanup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupEvent {
    /// The idle interval elapsed; the caller may emit a keep-alive unit.
    Heartbeat,
    /// All parts processed. Holds the parts whose records survived both attempts.
    Finished(Vec<PartEntry>),
}

/// Lazy cleanup over a list of parts.
pub struct PartCleanup<'a> {
    stores: PartStores<'a>,
    parts: std::vec::IntoIter<PartEntry>,
    remove_metadata: bool,
    timer: IdleTimer,
    failed: Vec<PartEntry>,
    finished: bool,
}

impl fmt::Debug for PartCleanup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartCleanup")
            .field("pool", &self.stores.pool)
            .field("remaining", &self.parts.len())
            .field("remove_metadata", &self.remove_metadata)
            .field("failed", &self.failed.len())
            .finish_non_exhaustive()
    }
}

impl<'a> PartCleanup<'a> {
    /// Prepare a cleanup of `parts`. Records are deleted only when `remove_metadata` is set.
    #[must_use]
    pub fn new(
        stores: PartStores<'a>,
        parts: Vec<PartEntry>,
        remove_metadata: bool,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            stores,
            parts: parts.into_iter(),
            remove_metadata,
            timer: IdleTimer::new(heartbeat_interval),
            failed: Vec::new(),
            finished: false,
        }
    }

    fn clean(&mut self, part: PartEntry) {
        let PartStores {
            metadata,
            bytes,
            pool,
        } = self.stores;

        if let Err(e) = retry_once("delete part bytes", || bytes.delete(pool, &part.storage_key)) {
            warn!(key = %part.storage_key, error = %e, "leaving part bytes behind");
        }

        if !self.remove_metadata {
            return;
        }
        let deleted = retry_once("delete part record", || {
            metadata.delete_part(&part.upload_id, part.part_number)
        });
        if let Err(e) = deleted {
            debug!(upload_id = %part.upload_id, part_number = part.part_number, error = %e, "part record survived cleanup");
            self.failed.push(part);
        }
    }
}

impl Iterator for PartCleanup<'_> {
    type Item = CleanupEvent;

    fn next(&mut self) -> Option<CleanupEvent> {
        if self.finished {
            return None;
        }
        while let Some(part) = self.parts.next() {
            self.clean(part);
            if self.timer.fire() {
                return Some(CleanupEvent::Heartbeat);
            }
        }
        self.finished = true;
        Some(CleanupEvent::Finished(std::mem::take(&mut self.failed)))
    }
}

/// Drain a cleanup, calling `on_heartbeat` for every heartbeat, and return the survivors.
fn drain(cleanup: PartCleanup<'_>, on_heartbeat: &mut impl FnMut()) -> Vec<PartEntry> {
    let mut survivors = Vec::new();
    for event in cleanup {
        match event {
            CleanupEvent::Heartbeat => on_heartbeat(),
            CleanupEvent::Finished(failed) => survivors = failed,
        }
    }
    survivors
}

/// Clean up `parts` under the majority-failure policy.
///
/// # Errors
///
/// Returns `InternalError` when more than half of the part records could not
/// be deleted in the first pass. No second pass runs in that case.
pub fn run_cleanup_with_policy(
    stores: PartStores<'_>,
    parts: Vec<PartEntry>,
    remove_metadata: bool,
    heartbeat_interval: Duration,
    mut on_heartbeat: impl FnMut(),
) -> Result<(), S3Error> {
    let total = parts.len();
    let cleanup = PartCleanup::new(stores, parts, remove_metadata, heartbeat_interval);
    let failed = drain(cleanup, &mut on_heartbeat);
    if failed.is_empty() {
        return Ok(());
    }

    if failed.len() > total / 2 {
        error!(
            failed = failed.len(),
            total, "most part records could not be deleted"
        );
        return Err(S3Error::internal_error(format!(
            "Failed to delete {} of {total} parts",
            failed.len()
        )));
    }

    let retry = PartCleanup::new(stores, failed, remove_metadata, heartbeat_interval);
    let residue = drain(retry, &mut on_heartbeat);
    if !residue.is_empty() {
        warn!(
            residue = residue.len(),
            total, "part records left behind after cleanup retry"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use harbor_s3_model::S3ErrorCode;

    use super::*;
    use crate::store::faulty::{FaultyByteStore, FaultyMetadataStore};

    const POOL: &str = "harbor";

    fn seed(metadata: &FaultyMetadataStore, bytes: &FaultyByteStore, count: u32) -> Vec<PartEntry> {
        (1..=count)
            .map(|n| {
                let part = PartEntry::new("u1", n, 4, "h");
                metadata.put_part(&part).unwrap();
                bytes.inner.write_at(POOL, &part.storage_key, 0, b"data").unwrap();
                part
            })
            .collect()
    }

    fn stores<'a>(metadata: &'a FaultyMetadataStore, bytes: &'a FaultyByteStore) -> PartStores<'a> {
        PartStores {
            metadata,
            bytes,
            pool: POOL,
        }
    }

    #[test]
    fn test_should_delete_bytes_and_records() {
        let metadata = FaultyMetadataStore::default();
        let bytes = FaultyByteStore::default();
        let parts = seed(&metadata, &bytes, 3);
        let keys: Vec<String> = parts.iter().map(|p| p.storage_key.clone()).collect();

        run_cleanup_with_policy(stores(&metadata, &bytes), parts, true, Duration::from_secs(60), || {})
            .unwrap();

        assert!(metadata.list_parts("u1").unwrap().is_empty());
        assert!(keys.iter().all(|k| !bytes.inner.contains(POOL, k)));
    }

    #[test]
    fn test_should_keep_records_when_only_bytes_requested() {
        let metadata = FaultyMetadataStore::default();
        let bytes = FaultyByteStore::default();
        let parts = seed(&metadata, &bytes, 2);
        let failing = parts[0].storage_key.clone();
        bytes.failing_deletes.lock().insert(failing.clone());

        run_cleanup_with_policy(stores(&metadata, &bytes), parts, false, Duration::from_secs(60), || {})
            .unwrap();

        assert_eq!(metadata.list_parts("u1").unwrap().len(), 2);
        assert_eq!(metadata.part_delete_calls.load(Ordering::SeqCst), 0);
        // one retry on the failing key, one call for the other
        assert_eq!(bytes.delete_calls.load(Ordering::SeqCst), 3);
        assert!(bytes.inner.contains(POOL, &failing));
    }

    #[test]
    fn test_should_fail_without_second_pass_when_majority_fails() {
        let metadata = FaultyMetadataStore::default();
        let bytes = FaultyByteStore::default();
        let parts = seed(&metadata, &bytes, 5);
        metadata.fail_part_deletes([1, 2, 3]);

        let err = run_cleanup_with_policy(
            stores(&metadata, &bytes),
            parts,
            true,
            Duration::from_secs(60),
            || {},
        )
        .unwrap_err();

        assert_eq!(err.code, S3ErrorCode::InternalError);
        // 3 failing parts tried twice, 2 healthy parts once, no further pass.
        assert_eq!(metadata.part_delete_calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_should_retry_minority_failures_and_accept_residue() {
        let metadata = FaultyMetadataStore::default();
        let bytes = FaultyByteStore::default();
        let parts = seed(&metadata, &bytes, 5);
        metadata.fail_part_deletes([4, 5]);

        run_cleanup_with_policy(stores(&metadata, &bytes), parts, true, Duration::from_secs(60), || {})
            .unwrap();

        // First pass: 2 * 2 + 3. Second pass over the two survivors: 2 * 2.
        assert_eq!(metadata.part_delete_calls.load(Ordering::SeqCst), 11);
        let left: Vec<u32> = metadata
            .list_parts("u1")
            .unwrap()
            .iter()
            .map(|p| p.part_number)
            .collect();
        assert_eq!(left, vec![4, 5]);
    }

    #[test]
    fn test_should_yield_heartbeats_then_finish() {
        let metadata = FaultyMetadataStore::default();
        let bytes = FaultyByteStore::default();
        let parts = seed(&metadata, &bytes, 3);
        metadata.fail_part_deletes([2]);

        let events: Vec<CleanupEvent> =
            PartCleanup::new(stores(&metadata, &bytes), parts, true, Duration::ZERO).collect();

        assert_eq!(events.len(), 4);
        assert!(events[..3].iter().all(|e| *e == CleanupEvent::Heartbeat));
        match &events[3] {
            CleanupEvent::Finished(failed) => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].part_number, 2);
            }
            CleanupEvent::Heartbeat => panic!("expected Finished"),
        }
    }
}
