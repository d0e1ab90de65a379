//! Multipart completion.
//!
//! Completion runs in two phases:
//!
//! 1. [`HarborS3::prepare_complete`] checks the request, takes the session
//!    from `Uploading` to `Composing`, validates the requested parts, and
//!    resets the destination object. Failures here are ordinary error
//!    responses.
//! 2. [`CompletionJob::run`] copies the parts into the object, records where
//!    each one landed, updates the object, and cleans up. Its output is the
//!    streamed response body: keep-alive units while the work runs, then
//!    either a `CompleteMultipartUploadResult` or an `<Error>` document.
//!
//! Any failure after the session entered `Composing` puts it back to
//! `Uploading`, so the client can retry or abort.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use harbor_s3_model::error::{S3Error, S3ErrorCode};
use harbor_s3_model::types::{CompleteMultipartUploadOutput, CompletedPart};
use harbor_s3_xml::{error_to_xml_fragment, to_xml_fragment};
use tracing::{debug, error, info, warn};

use super::cleanup::{PartStores, run_cleanup_with_policy};
use crate::checksums::{OffsetMd5, compute_multipart_etag};
use crate::error::StoreError;
use crate::keepalive::{ChunkSink, KeepAlive};
use crate::provider::HarborS3;
use crate::state::{Bucket, ObjectEntry, PartEntry, UploadSession, UploadState};
use crate::store::{ByteStore, MetadataStore, retry_once};

/// Identifies the completion a client asked for.
#[derive(Debug, Clone)]
pub struct CompletionTarget {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Session to complete.
    pub upload_id: String,
    /// `Location` reported on success.
    pub location: String,
    /// Request id reported in a trailing `<Error>` document.
    pub request_id: String,
}

/// A prepared completion holding the session in `Composing`.
///
/// Dropping a job without running it leaves the session in `Composing`.
pub struct CompletionJob {
    metadata: Arc<dyn MetadataStore>,
    bytes: Arc<dyn ByteStore>,
    keep_alive_interval: Duration,
    target: CompletionTarget,
    bucket: Bucket,
    session: UploadSession,
    object: ObjectEntry,
    used: Vec<PartEntry>,
    unused: Vec<PartEntry>,
    etag: String,
}

impl fmt::Debug for CompletionJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionJob")
            .field("target", &self.target)
            .field("object_id", &self.object.id)
            .field("used", &self.used.len())
            .field("unused", &self.unused.len())
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Check that part numbers are listed and strictly ascending.
fn check_part_order(requested: &[CompletedPart]) -> Result<(), S3Error> {
    if requested.is_empty() {
        return Err(S3Error::malformed_xml(
            "CompleteMultipartUpload must list at least one part",
        ));
    }
    if let Some(pair) = requested
        .windows(2)
        .find(|pair| pair[0].part_number >= pair[1].part_number)
    {
        return Err(S3Error::invalid_part_order(format!(
            "PartNumber={} follows PartNumber={}",
            pair[1].part_number, pair[0].part_number
        )));
    }
    Ok(())
}

/// Split the stored parts into the requested ones, in request order, and the rest.
fn select_parts(
    requested: &[CompletedPart],
    stored: Vec<PartEntry>,
    min_part_size: u64,
) -> Result<(Vec<PartEntry>, Vec<PartEntry>), S3Error> {
    let wanted: HashSet<u32> = requested.iter().map(|p| p.part_number).collect();
    let (mut used, unused): (Vec<PartEntry>, Vec<PartEntry>) = stored
        .into_iter()
        .partition(|p| wanted.contains(&p.part_number));
    used.sort_by_key(|p| p.part_number);

    let last = requested.last().map_or(0, |p| p.part_number);
    for want in requested {
        let n = want.part_number;
        let Some(part) = used.iter().find(|p| p.part_number == n) else {
            return Err(S3Error::invalid_part(format!("PartNumber={n}")));
        };
        if n != last && part.size < min_part_size {
            return Err(S3Error::with_message(
                S3ErrorCode::EntityTooSmall,
                format!(
                    "Part {n} is {} bytes, below the minimum of {min_part_size}",
                    part.size
                ),
            )
            .with_resource(format!("PartNumber={n}")));
        }
        if want.unquoted_etag() != part.hash {
            return Err(S3Error::invalid_part(format!("PartNumber={n}")));
        }
    }
    if used.len() != requested.len() {
        return Err(S3Error::invalid_part(format!(
            "{} of {} requested parts resolved",
            used.len(),
            requested.len()
        )));
    }
    Ok((used, unused))
}

fn revert_to_uploading(metadata: &dyn MetadataStore, upload_id: &str) {
    if let Err(e) = metadata.set_upload_state(upload_id, UploadState::Uploading) {
        error!(upload_id = %upload_id, error = %e, "failed to return upload to uploading");
    }
}

impl HarborS3 {
    /// Validate a completion and take the session into `Composing`.
    ///
    /// `requested` is the part list from the request body. On success no
    /// part byte has moved yet; the returned job does the copying.
    ///
    /// # Errors
    ///
    /// - `MalformedXML` for an empty part list, `InvalidPartOrder` when the
    ///   part numbers are not strictly ascending.
    /// - `NoSuchBucket`/`AccessDenied` from the bucket check.
    /// - `NoSuchUpload` when the session is missing, targets another object,
    ///   or was already completed.
    /// - `CompleteMultipartUploadAlreadyInProgress` when another completion
    ///   holds the session.
    /// - `EntityTooSmall` and `InvalidPart` from part validation, and
    ///   `InvalidRequest` when the destination cannot be reset. The session
    ///   is back in `Uploading` after these.
    pub fn prepare_complete(
        &self,
        target: CompletionTarget,
        requested: &[CompletedPart],
        principal: Option<&str>,
    ) -> Result<CompletionJob, S3Error> {
        check_part_order(requested)?;
        let bucket = self.bucket_for(&target.bucket, principal)?;
        let upload_id = target.upload_id.clone();
        let upload_id = upload_id.as_str();

        let session = self.load_session(upload_id, &target.bucket, &target.key)?;
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
            let current = self
                .metadata
                .get_upload(upload_id)
                .map_err(StoreError::into_s3_error)?;
            return Err(match current.map(|s| s.state) {
                Some(UploadState::Composing) => S3Error::upload_in_progress(upload_id),
                None => S3Error::no_such_upload(upload_id),
                Some(state) => S3Error::internal_error(format!(
                    "Failed to lock upload {upload_id} in state {state:?}"
                )),
            });
        }
        debug!(upload_id = %upload_id, "upload entered composing");

        match self.stage(target, requested, bucket, session) {
            Ok(job) => Ok(job),
            Err(e) => {
                revert_to_uploading(self.metadata.as_ref(), upload_id);
                Err(e)
            }
        }
    }

    /// Validation and destination reset, run while holding `Composing`.
    fn stage(
        &self,
        target: CompletionTarget,
        requested: &[CompletedPart],
        bucket: Bucket,
        session: UploadSession,
    ) -> Result<CompletionJob, S3Error> {
        let stored = self
            .metadata
            .list_parts(&target.upload_id)
            .map_err(StoreError::into_s3_error)?;
        let (used, unused) = select_parts(requested, stored, self.config.s3_min_part_size)?;

        let hashes: Vec<&str> = used.iter().map(|p| p.hash.as_str()).collect();
        let etag = compute_multipart_etag(&hashes);

        let (object, created) = self
            .metadata
            .get_or_create_object(bucket.id, &target.key)
            .map_err(StoreError::into_s3_error)?;
        // A failed earlier completion can leave bytes behind a size-0 record.
        if !created {
            match self
                .bytes
                .truncate(&bucket.pool, &object.storage_key(bucket.id), 0)
            {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(S3Error::invalid_request(format!(
                        "Failed to reset object {}: {e}",
                        target.key
                    ))
                    .with_source(e));
                }
            }
        }

        Ok(CompletionJob {
            metadata: Arc::clone(&self.metadata),
            bytes: Arc::clone(&self.bytes),
            keep_alive_interval: self.config.keep_alive_interval(),
            target,
            bucket,
            session,
            object,
            used,
            unused,
            etag,
        })
    }
}

impl CompletionJob {
    /// The aggregate ETag the completed object will report.
    #[must_use]
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Combine the parts, streaming keep-alive units and the final document into `sink`.
    ///
    /// Returns the sink once the document has been sent.
    pub fn run<S: ChunkSink>(self, sink: S) -> S {
        let mut keepalive = KeepAlive::new(sink, self.keep_alive_interval);
        let outcome = self.combine(&mut keepalive).and_then(|output| {
            to_xml_fragment("CompleteMultipartUploadResult", &output).map_err(|e| {
                S3Error::internal_error(format!("Failed to serialize completion result: {e}"))
            })
        });

        let document = match outcome {
            Ok(document) => document,
            Err(err) => {
                error!(
                    upload_id = %self.target.upload_id,
                    code = %err.code,
                    error = %err.message,
                    "multipart completion failed"
                );
                revert_to_uploading(self.metadata.as_ref(), &self.target.upload_id);
                error_to_xml_fragment(
                    err.code.as_str(),
                    &err.message,
                    err.resource.as_deref(),
                    &self.target.request_id,
                )
            }
        };
        keepalive.finish(document)
    }

    fn stores(&self) -> PartStores<'_> {
        PartStores {
            metadata: self.metadata.as_ref(),
            bytes: self.bytes.as_ref(),
            pool: &self.bucket.pool,
        }
    }

    fn combine<S: ChunkSink>(
        &self,
        keepalive: &mut KeepAlive<S>,
    ) -> Result<CompleteMultipartUploadOutput, S3Error> {
        let pool = self.bucket.pool.as_str();
        let object_key = self.object.storage_key(self.bucket.id);
        let parts_count = u32::try_from(self.used.len()).unwrap_or(u32::MAX);
        let aggregate = self.etag.trim_matches('"');
        let mut digest = OffsetMd5::new();
        let mut offset = 0u64;

        for part in &self.used {
            let start = offset;
            let chunks = self
                .bytes
                .read_chunks(pool, &part.storage_key)
                .map_err(StoreError::into_s3_error)?;
            for chunk in chunks {
                let chunk = chunk.map_err(StoreError::into_s3_error)?;
                retry_once("write object", || {
                    self.bytes.write_at(pool, &object_key, offset, &chunk)
                })
                .map_err(StoreError::into_s3_error)?;
                digest.update(offset, &chunk);
                offset += chunk.len() as u64;
                keepalive.tick();
            }
            if offset - start != part.size {
                return Err(S3Error::internal_error(format!(
                    "Part {} holds {} bytes, expected {}",
                    part.part_number,
                    offset - start,
                    part.size
                )));
            }

            let mut linked = part.clone();
            linked.object_offset = Some(start);
            linked.object_id = Some(self.object.id);
            linked.object_hash = Some(aggregate.to_owned());
            linked.parts_count = Some(parts_count);
            self.metadata
                .update_part(&linked)
                .map_err(StoreError::into_s3_error)?;
        }

        let mut object = self.object.clone();
        object.size = offset;
        object.hash = digest.hex_digest();
        object.modified = Utc::now();
        object.permission = self.session.permission;
        object.share_time_limited = false;
        self.metadata
            .update_object(self.bucket.id, &object)
            .map_err(StoreError::into_s3_error)?;

        run_cleanup_with_policy(
            self.stores(),
            self.unused.clone(),
            true,
            self.keep_alive_interval,
            || keepalive.tick(),
        )?;
        run_cleanup_with_policy(
            self.stores(),
            self.used.clone(),
            false,
            self.keep_alive_interval,
            || keepalive.tick(),
        )?;

        let upload_id = self.target.upload_id.as_str();
        if let Err(e) = retry_once("delete upload", || self.metadata.delete_upload(upload_id)) {
            warn!(upload_id = %upload_id, error = %e, "keeping completed upload as a tombstone");
            if let Err(e) = self
                .metadata
                .set_upload_state(upload_id, UploadState::Completed)
            {
                error!(upload_id = %upload_id, error = %e, "failed to mark upload completed");
            }
        }

        info!(
            bucket = %self.target.bucket,
            key = %self.target.key,
            upload_id = %upload_id,
            size = offset,
            parts = parts_count,
            "completed multipart upload"
        );
        Ok(CompleteMultipartUploadOutput {
            location: self.target.location.clone(),
            bucket: self.target.bucket.clone(),
            key: self.target.key.clone(),
            e_tag: self.etag.clone(),
        })
    }
}
