//! Multipart upload abort.
//!
//! Abort takes the same `Uploading -> Composing` gate as completion, so an
//! abort and a completion of one session never run at the same time.

use harbor_s3_model::error::S3Error;
use tracing::{info, warn};

use super::cleanup::{PartStores, run_cleanup_with_policy};
use crate::error::StoreError;
use crate::provider::HarborS3;
use crate::state::{PartEntry, UploadState};
use crate::store::retry_once;

impl HarborS3 {
    /// Abort an upload, deleting its parts and the session.
    ///
    /// Parts already written into an object are left alone.
    ///
    /// # Errors
    ///
    /// - `NoSuchUpload` when the session is missing, targets another object,
    ///   or was already completed.
    /// - `CompleteMultipartUploadAlreadyInProgress` while a completion holds
    ///   the session.
    /// - `InternalError` when most parts, or the session record, could not
    ///   be deleted. The session is back in `Uploading` afterwards.
    pub fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        principal: Option<&str>,
    ) -> Result<(), S3Error> {
        let target = self.bucket_for(bucket, principal)?;
        let session = self.load_session(upload_id, bucket, key)?;
        match session.state {
            UploadState::Uploading => {}
            UploadState::Composing => return Err(S3Error::upload_in_progress(upload_id)),
            UploadState::Completed => {
                if let Err(e) = self.metadata.delete_upload(upload_id) {
                    warn!(upload_id = %upload_id, error = %e, "failed to delete completed upload");
                }
                return Err(S3Error::no_such_upload(upload_id));
            }
        }

        let locked = self
            .metadata
            .transition_upload(upload_id, UploadState::Uploading, UploadState::Composing)
            .map_err(StoreError::into_s3_error)?;
        if !locked {
            return Err(S3Error::upload_in_progress(upload_id));
        }

        if let Err(err) = self.discard(&target.pool, upload_id) {
            if let Err(e) = self
                .metadata
                .set_upload_state(upload_id, UploadState::Uploading)
            {
                warn!(upload_id = %upload_id, error = %e, "failed to return upload to uploading");
            }
            return Err(err);
        }

        info!(bucket = %bucket, key = %key, upload_id = %upload_id, "aborted multipart upload");
        Ok(())
    }

    fn discard(&self, pool: &str, upload_id: &str) -> Result<(), S3Error> {
        let parts: Vec<PartEntry> = self
            .metadata
            .list_parts(upload_id)
            .map_err(StoreError::into_s3_error)?
            .into_iter()
            .filter(|p| !p.is_linked())
            .collect();

        let stores = PartStores {
            metadata: self.metadata.as_ref(),
            bytes: self.bytes.as_ref(),
            pool,
        };
        run_cleanup_with_policy(
            stores,
            parts,
            true,
            self.config.keep_alive_interval(),
            || {},
        )?;

        retry_once("delete upload", || self.metadata.delete_upload(upload_id))
            .map_err(StoreError::into_s3_error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use harbor_s3_model::S3ErrorCode;

    use crate::config::S3Config;
    use crate::ops::multipart::UploadPartRequest;
    use crate::provider::HarborS3;
    use crate::state::UploadState;
    use crate::store::MetadataStore;
    use crate::store::faulty::{FaultyByteStore, FaultyMetadataStore};

    fn setup(parts: u32) -> (HarborS3, Arc<FaultyMetadataStore>, Arc<FaultyByteStore>, String) {
        let metadata = Arc::new(FaultyMetadataStore::default());
        let bytes = Arc::new(FaultyByteStore::default());
        let provider = HarborS3::with_stores(S3Config::default(), metadata.clone(), bytes.clone());
        provider.create_bucket("photos", None).unwrap();
        let upload_id = provider
            .create_multipart_upload("photos", "big.bin", None)
            .unwrap()
            .upload_id;
        for part_number in 1..=parts {
            provider
                .upload_part(
                    UploadPartRequest {
                        bucket: "photos",
                        key: "big.bin",
                        upload_id: &upload_id,
                        part_number,
                        body: b"part",
                        content_md5: None,
                    },
                    None,
                )
                .unwrap();
        }
        (provider, metadata, bytes, upload_id)
    }

    #[test]
    fn test_should_delete_parts_and_session() {
        let (provider, metadata, bytes, id) = setup(3);
        let keys: Vec<String> = metadata
            .list_parts(&id)
            .unwrap()
            .into_iter()
            .map(|p| p.storage_key)
            .collect();

        provider
            .abort_multipart_upload("photos", "big.bin", &id, None)
            .unwrap();

        assert!(metadata.get_upload(&id).unwrap().is_none());
        assert!(metadata.list_parts(&id).unwrap().is_empty());
        assert!(keys.iter().all(|k| !bytes.inner.contains("harbor", k)));
    }

    #[test]
    fn test_should_report_missing_upload() {
        let (provider, ..) = setup(0);
        let err = provider
            .abort_multipart_upload("photos", "big.bin", "nope", None)
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchUpload);
    }

    #[test]
    fn test_should_refuse_abort_while_composing_and_keep_parts() {
        let (provider, metadata, bytes, id) = setup(2);
        metadata
            .set_upload_state(&id, UploadState::Composing)
            .unwrap();

        let err = provider
            .abort_multipart_upload("photos", "big.bin", &id, None)
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::CompleteMultipartUploadAlreadyInProgress);

        let parts = metadata.list_parts(&id).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| bytes.inner.contains("harbor", &p.storage_key)));
        assert_eq!(bytes.delete_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_should_drop_completed_tombstone() {
        let (provider, metadata, _, id) = setup(1);
        metadata
            .set_upload_state(&id, UploadState::Completed)
            .unwrap();

        let err = provider
            .abort_multipart_upload("photos", "big.bin", &id, None)
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchUpload);
        assert!(metadata.get_upload(&id).unwrap().is_none());
    }

    #[test]
    fn test_should_fail_and_reopen_when_most_parts_survive() {
        let (provider, metadata, _, id) = setup(3);
        metadata.fail_part_deletes([1, 2]);

        let err = provider
            .abort_multipart_upload("photos", "big.bin", &id, None)
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InternalError);
        assert_eq!(
            metadata.get_upload(&id).unwrap().map(|s| s.state),
            Some(UploadState::Uploading)
        );
    }

    #[test]
    fn test_should_fail_when_session_record_cannot_be_deleted() {
        let (provider, metadata, _, id) = setup(1);
        metadata.fail_delete_upload.store(2, Ordering::SeqCst);

        let err = provider
            .abort_multipart_upload("photos", "big.bin", &id, None)
            .unwrap_err();
        assert_eq!(err.code, S3ErrorCode::InternalError);
        assert!(metadata.get_upload(&id).unwrap().is_some());
    }

    #[test]
    fn test_should_succeed_after_one_failed_session_delete() {
        let (provider, metadata, _, id) = setup(1);
        metadata.fail_delete_upload.store(1, Ordering::SeqCst);

        provider
            .abort_multipart_upload("photos", "big.bin", &id, None)
            .unwrap();
        assert!(metadata.get_upload(&id).unwrap().is_none());
    }
}
