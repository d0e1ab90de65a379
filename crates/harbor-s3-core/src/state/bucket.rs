//! Bucket records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an object may be shared.
///
/// Buckets carry a default that new uploads inherit; completed objects take
/// the permission of the upload that produced them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharePermission {
    /// Only the owner may access the object.
    #[default]
    Private,
    /// Anyone may read the object.
    PublicRead,
    /// Anyone may read or overwrite the object.
    PublicReadWrite,
}

/// A bucket and the pool its bytes live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Numeric id, part of every object's storage key.
    pub id: u64,
    /// Bucket name.
    pub name: String,
    /// Id of the owning principal.
    pub owner: String,
    /// Storage pool holding the bucket's object and part bytes.
    pub pool: String,
    /// Permission inherited by uploads into this bucket.
    pub default_permission: SharePermission,
    /// Creation time.
    pub created: DateTime<Utc>,
}

impl Bucket {
    /// Create a private bucket record.
    #[must_use]
    pub fn new(
        id: u64,
        name: impl Into<String>,
        owner: impl Into<String>,
        pool: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
            pool: pool.into(),
            default_permission: SharePermission::Private,
            created: Utc::now(),
        }
    }

    /// Whether `principal_id` owns this bucket.
    #[must_use]
    pub fn is_owned_by(&self, principal_id: &str) -> bool {
        self.owner == principal_id
    }
}
