//! Bucket operations.

use harbor_s3_model::error::S3Error;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::provider::{ANONYMOUS_OWNER, HarborS3};
use crate::state::Bucket;

impl HarborS3 {
    /// Create a bucket owned by `principal` in the default pool.
    ///
    /// # Errors
    ///
    /// `BucketAlreadyOwnedByYou` when the caller already owns a bucket with
    /// this name, `BucketAlreadyExists` when someone else does.
    pub fn create_bucket(&self, name: &str, principal: Option<&str>) -> Result<Bucket, S3Error> {
        let owner = principal.unwrap_or(ANONYMOUS_OWNER);
        match self
            .metadata
            .create_bucket(name, owner, &self.config.s3_default_pool)
        {
            Ok(bucket) => {
                info!(bucket = %name, owner = %owner, pool = %bucket.pool, "created bucket");
                Ok(bucket)
            }
            Err(StoreError::AlreadyExists(_)) => {
                let existing = self
                    .metadata
                    .get_bucket(name)
                    .map_err(StoreError::into_s3_error)?;
                match existing {
                    Some(bucket) if bucket.is_owned_by(owner) => {
                        Err(S3Error::bucket_already_owned_by_you(name))
                    }
                    _ => Err(S3Error::bucket_already_exists(name)),
                }
            }
            Err(e) => Err(e.into_s3_error()),
        }
    }

    /// Load a bucket and check that `principal` owns it.
    ///
    /// `None` skips the ownership check.
    pub(crate) fn bucket_for(&self, name: &str, principal: Option<&str>) -> Result<Bucket, S3Error> {
        let bucket = self
            .metadata
            .get_bucket(name)
            .map_err(StoreError::into_s3_error)?
            .ok_or_else(|| S3Error::no_such_bucket(name))?;

        if let Some(principal) = principal
            && !bucket.is_owned_by(principal)
        {
            debug!(bucket = %name, principal = %principal, owner = %bucket.owner, "bucket owner mismatch");
            return Err(S3Error::access_denied(name));
        }
        Ok(bucket)
    }
}

#[cfg(test)]
mod tests {
    use harbor_s3_model::S3ErrorCode;

    use crate::config::S3Config;
    use crate::provider::HarborS3;

    #[test]
    fn test_should_create_bucket_in_default_pool() {
        let provider = HarborS3::new(S3Config::default());
        let bucket = provider.create_bucket("photos", Some("alice")).unwrap();
        assert_eq!(bucket.owner, "alice");
        assert_eq!(bucket.pool, "harbor");
    }

    #[test]
    fn test_should_distinguish_owned_and_foreign_bucket_conflicts() {
        let provider = HarborS3::new(S3Config::default());
        provider.create_bucket("photos", Some("alice")).unwrap();

        let err = provider.create_bucket("photos", Some("alice")).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketAlreadyOwnedByYou);

        let err = provider.create_bucket("photos", Some("bob")).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::BucketAlreadyExists);
    }

    #[test]
    fn test_should_enforce_ownership_only_for_named_principal() {
        let provider = HarborS3::new(S3Config::default());
        provider.create_bucket("photos", Some("alice")).unwrap();

        assert!(provider.bucket_for("photos", Some("alice")).is_ok());
        assert!(provider.bucket_for("photos", None).is_ok());

        let err = provider.bucket_for("photos", Some("bob")).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::AccessDenied);

        let err = provider.bucket_for("missing", None).unwrap_err();
        assert_eq!(err.code, S3ErrorCode::NoSuchBucket);
    }
}
