//! Request and response shapes of the multipart upload API.

use serde::{Deserialize, Serialize};

/// One `<Part>` entry of a `CompleteMultipartUpload` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompletedPart {
    /// The part number the client uploaded.
    pub part_number: u32,
    /// The ETag the client received for the part, possibly quoted.
    #[serde(rename = "ETag")]
    pub e_tag: String,
}

impl CompletedPart {
    /// The ETag with surrounding double quotes removed.
    #[must_use]
    pub fn unquoted_etag(&self) -> &str {
        self.e_tag.trim_matches('"')
    }
}

/// The parsed `CompleteMultipartUpload` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMultipartUpload {
    /// Parts in the order the client listed them.
    pub parts: Vec<CompletedPart>,
}

/// Payload of `InitiateMultipartUploadResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMultipartUploadOutput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// The new upload session id.
    pub upload_id: String,
}

/// Payload of `CompleteMultipartUploadResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteMultipartUploadOutput {
    /// Path-style location of the assembled object.
    pub location: String,
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Aggregate ETag, quoted, in the `"<md5>-<count>"` form.
    pub e_tag: String,
}
