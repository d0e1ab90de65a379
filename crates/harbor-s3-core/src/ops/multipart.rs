//! Upload initiation and part uploads.

use harbor_s3_model::error::{S3Error, S3ErrorCode};
use harbor_s3_model::s3_error;
use harbor_s3_model::types::CreateMultipartUploadOutput;
use tracing::{debug, info, warn};

use crate::checksums::{compute_md5, content_md5_matches};
use crate::error::StoreError;
use crate::provider::HarborS3;
use crate::state::{PartEntry, UploadSession, UploadState};
use crate::store::retry_once;

/// Highest part number a client may upload.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// A single `UploadPart` call.
#[derive(Debug, Clone, Copy)]
pub struct UploadPartRequest<'a> {
    /// Target bucket.
    pub bucket: &'a str,
    /// Target key.
    pub key: &'a str,
    /// Session the part belongs to.
    pub upload_id: &'a str,
    /// Part number, `1..=10000`.
    pub part_number: u32,
    /// Part bytes.
    pub body: &'a [u8],
    /// Base64 `Content-MD5` header, when sent.
    pub content_md5: Option<&'a str>,
}

impl HarborS3 {
    /// Start a multipart upload of `bucket`/`key`.
    ///
    /// The session inherits the bucket's default permission.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket` or `AccessDenied` from the bucket lookup.
    pub fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        principal: Option<&str>,
    ) -> Result<CreateMultipartUploadOutput, S3Error> {
        let target = self.bucket_for(bucket, principal)?;
        let session = UploadSession::new(
            bucket,
            key,
            principal.unwrap_or(target.owner.as_str()),
            target.default_permission,
        );
        self.metadata
            .create_upload(&session)
            .map_err(StoreError::into_s3_error)?;

        info!(bucket = %bucket, key = %key, upload_id = %session.id, "initiated multipart upload");
        Ok(CreateMultipartUploadOutput {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            upload_id: session.id,
        })
    }

    /// Store one part and return its quoted ETag.
    ///
    /// A part with the same number replaces the earlier one; the replaced
    /// part's bytes are deleted.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a part number outside `1..=10000`,
    /// `EntityTooLarge` above the configured maximum, `InvalidDigest` when
    /// `Content-MD5` does not match, `NoSuchUpload` or a conflict from the
    /// session check, and `InternalError` when the bytes cannot be stored.
    pub fn upload_part(
        &self,
        request: UploadPartRequest<'_>,
        principal: Option<&str>,
    ) -> Result<String, S3Error> {
        let UploadPartRequest {
            bucket,
            key,
            upload_id,
            part_number,
            body,
            content_md5,
        } = request;

        if !(1..=MAX_PART_NUMBER).contains(&part_number) {
            return Err(S3Error::invalid_argument(format!(
                "Part number must be an integer between 1 and {MAX_PART_NUMBER}, inclusive"
            )));
        }
        let size = body.len() as u64;
        if size > self.config.s3_max_part_size {
            return Err(s3_error!(
                EntityTooLarge,
                format!(
                    "Part {part_number} is {size} bytes, above the maximum of {}",
                    self.config.s3_max_part_size
                )
            ));
        }
        if let Some(header) = content_md5
            && !content_md5_matches(header, body)
        {
            return Err(S3Error::new(S3ErrorCode::InvalidDigest));
        }

        let target = self.bucket_for(bucket, principal)?;
        let session = self.load_session(upload_id, bucket, key)?;
        match session.state {
            UploadState::Uploading => {}
            UploadState::Composing => return Err(S3Error::upload_in_progress(upload_id)),
            UploadState::Completed => return Err(S3Error::no_such_upload(upload_id)),
        }

        let part = PartEntry::new(upload_id, part_number, size, compute_md5(body));
        retry_once("write part", || {
            self.bytes.write_at(&target.pool, &part.storage_key, 0, body)
        })
        .map_err(StoreError::into_s3_error)?;

        let replaced = match self.metadata.put_part(&part) {
            Ok(replaced) => replaced,
            Err(e) => {
                if let Err(cleanup) = self.bytes.delete(&target.pool, &part.storage_key) {
                    warn!(key = %part.storage_key, error = %cleanup, "orphaned part bytes");
                }
                return Err(e.into_s3_error());
            }
        };
        if let Some(old) = replaced {
            debug!(upload_id = %upload_id, part_number, "replacing earlier part");
            if let Err(e) = self.bytes.delete(&target.pool, &old.storage_key) {
                warn!(key = %old.storage_key, error = %e, "failed to delete replaced part bytes");
            }
        }

        debug!(upload_id = %upload_id, part_number, size, "stored part");
        Ok(part.etag())
    }

    /// Load the session `upload_id` and check that it targets `bucket`/`key`.
    pub(crate) fn load_session(
        &self,
        upload_id: &str,
        bucket: &str,
        key: &str,
    ) -> Result<UploadSession, S3Error> {
        self.metadata
            .get_upload(upload_id)
            .map_err(StoreError::into_s3_error)?
            .filter(|session| session.targets(bucket, key))
            .ok_or_else(|| S3Error::no_such_upload(upload_id))
    }
}
