//! Reading assembled objects.

use bytes::{Bytes, BytesMut};
use harbor_s3_model::error::S3Error;

use crate::error::StoreError;
use crate::provider::HarborS3;
use crate::state::ObjectEntry;

/// An object's record together with its bytes.
#[derive(Debug, Clone)]
pub struct ObjectRead {
    /// The object record.
    pub entry: ObjectEntry,
    /// The payload.
    pub body: Bytes,
}

impl HarborS3 {
    /// Read a whole object.
    ///
    /// Objects that exist only as placeholders of an unfinished completion
    /// are reported as missing.
    ///
    /// # Errors
    ///
    /// `NoSuchBucket`/`AccessDenied` from the bucket check, `NoSuchKey` when
    /// the object does not exist or was never written.
    pub fn get_object(
        &self,
        bucket: &str,
        key: &str,
        principal: Option<&str>,
    ) -> Result<ObjectRead, S3Error> {
        let target = self.bucket_for(bucket, principal)?;
        let entry = self
            .metadata
            .get_object(target.id, key)
            .map_err(StoreError::into_s3_error)?
            .filter(ObjectEntry::is_written)
            .ok_or_else(|| S3Error::no_such_key(key))?;

        if entry.size == 0 {
            return Ok(ObjectRead {
                entry,
                body: Bytes::new(),
            });
        }

        let chunks = self
            .bytes
            .read_chunks(&target.pool, &entry.storage_key(target.id))
            .map_err(|e| {
                if e.is_not_found() {
                    S3Error::no_such_key(key)
                } else {
                    e.into_s3_error()
                }
            })?;
        let size = usize::try_from(entry.size).map_err(|_| {
            S3Error::internal_error(format!("Object {key} is too large to read"))
        })?;
        let mut body = BytesMut::with_capacity(size);
        for chunk in chunks {
            let chunk = chunk.map_err(StoreError::into_s3_error)?;
            let remaining = size - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if body.len() == size {
                break;
            }
        }
        Ok(ObjectRead {
            entry,
            body: body.freeze(),
        })
    }
}
