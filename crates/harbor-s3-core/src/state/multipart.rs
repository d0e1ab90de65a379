//! Multipart upload sessions and their parts.
//!
//! A session moves `Uploading -> Composing` through a compare-and-set when a
//! completion starts, back to `Uploading` if the completion fails, and is
//! deleted (or, failing that, left as a `Completed` tombstone) when it
//! succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bucket::SharePermission;

/// Lifecycle state of an [`UploadSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadState {
    /// Accepting parts.
    Uploading,
    /// A completion holds the session and is combining parts.
    Composing,
    /// Completed, but the session record could not be deleted.
    Completed,
}

/// An in-progress multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Upload id handed to the client.
    pub id: String,
    /// Name of the target bucket.
    pub bucket: String,
    /// Target object key.
    pub key: String,
    /// Current lifecycle state.
    pub state: UploadState,
    /// Permission the completed object will carry.
    pub permission: SharePermission,
    /// When the upload was initiated.
    pub initiated: DateTime<Utc>,
    /// Id of the principal that initiated the upload.
    pub owner: String,
}

impl UploadSession {
    /// Start a new session in the `Uploading` state with a fresh id.
    #[must_use]
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        owner: impl Into<String>,
        permission: SharePermission,
    ) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            bucket: bucket.into(),
            key: key.into(),
            state: UploadState::Uploading,
            permission,
            initiated: Utc::now(),
            owner: owner.into(),
        }
    }

    /// Whether this session targets `bucket`/`key`.
    #[must_use]
    pub fn targets(&self, bucket: &str, key: &str) -> bool {
        self.bucket == bucket && self.key == key
    }
}

/// One uploaded part.
///
/// The `object_*` and `parts_count` fields stay empty until a completion
/// writes the part into an object; afterwards they record where it landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartEntry {
    /// Owning upload.
    pub upload_id: String,
    /// Part number, unique within the upload.
    pub part_number: u32,
    /// Size in bytes.
    pub size: u64,
    /// Hex MD5 of the part's bytes.
    pub hash: String,
    /// Key of the part's bytes within the bucket's pool.
    pub storage_key: String,
    /// Upload time.
    pub modified: DateTime<Utc>,
    /// Offset of this part within the assembled object.
    pub object_offset: Option<u64>,
    /// Id of the object this part was written into.
    pub object_id: Option<u64>,
    /// Aggregate hash of the object this part belongs to.
    pub object_hash: Option<String>,
    /// Number of parts in that object.
    pub parts_count: Option<u32>,
}

impl PartEntry {
    /// Create an unlinked part record with a fresh storage key.
    #[must_use]
    pub fn new(
        upload_id: impl Into<String>,
        part_number: u32,
        size: u64,
        hash: impl Into<String>,
    ) -> Self {
        let upload_id = upload_id.into();
        let storage_key = format!(
            "upload_{upload_id}_part_{part_number}_{}",
            Uuid::new_v4().simple()
        );
        Self {
            upload_id,
            part_number,
            size,
            hash: hash.into(),
            storage_key,
            modified: Utc::now(),
            object_offset: None,
            object_id: None,
            object_hash: None,
            parts_count: None,
        }
    }

    /// Whether a completion has written this part into an object.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.object_id.is_some()
    }

    /// The part's ETag as returned to clients.
    #[must_use]
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.hash)
    }
}
