//! Operations routed by the gateway.

use std::fmt;

/// All S3 operations the gateway understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum S3Operation {
    /// The CreateBucket operation.
    CreateBucket,
    /// The GetObject operation.
    GetObject,
    /// The CreateMultipartUpload operation.
    CreateMultipartUpload,
    /// The UploadPart operation.
    UploadPart,
    /// The CompleteMultipartUpload operation.
    CompleteMultipartUpload,
    /// The AbortMultipartUpload operation.
    AbortMultipartUpload,
}

impl S3Operation {
    /// Returns the operation name as it appears in AWS documentation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateBucket => "CreateBucket",
            Self::GetObject => "GetObject",
            Self::CreateMultipartUpload => "CreateMultipartUpload",
            Self::UploadPart => "UploadPart",
            Self::CompleteMultipartUpload => "CompleteMultipartUpload",
            Self::AbortMultipartUpload => "AbortMultipartUpload",
        }
    }

    /// Whether the operation targets an object key rather than only a bucket.
    #[must_use]
    pub fn requires_key(&self) -> bool {
        !matches!(self, Self::CreateBucket)
    }
}

impl fmt::Display for S3Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
