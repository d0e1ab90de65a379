//! Object records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bucket::SharePermission;

/// An object's metadata. The bytes live in the bucket's pool under
/// [`ObjectEntry::storage_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectEntry {
    /// Numeric id, unique within the store.
    pub id: u64,
    /// Bucket-relative key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Hex MD5 of the whole payload. Empty until the object has been written.
    pub hash: String,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Sharing permission.
    pub permission: SharePermission,
    /// Whether sharing is limited in time.
    pub share_time_limited: bool,
}

impl ObjectEntry {
    /// Create an empty, never-written object.
    #[must_use]
    pub fn new(id: u64, key: impl Into<String>) -> Self {
        Self {
            id,
            key: key.into(),
            size: 0,
            hash: String::new(),
            modified: Utc::now(),
            permission: SharePermission::Private,
            share_time_limited: false,
        }
    }

    /// Key of this object's bytes within the bucket's pool.
    ///
    /// # Examples
    ///
    /// ```
    /// use harbor_s3_core::state::ObjectEntry;
    ///
    /// assert_eq!(ObjectEntry::new(42, "a/b.txt").storage_key(7), "7_42");
    /// ```
    #[must_use]
    pub fn storage_key(&self, bucket_id: u64) -> String {
        format!("{bucket_id}_{}", self.id)
    }

    /// Whether the object holds a completed payload.
    #[must_use]
    pub fn is_written(&self) -> bool {
        !self.hash.is_empty()
    }

    /// The quoted content hash.
    #[must_use]
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.hash)
    }
}
