//! S3 operation handler implementation for [`HarborS3`].
//!
//! This module bridges the HTTP layer (`harbor-s3-http`) with the gateway
//! operations by implementing the [`S3Handler`] trait. Store calls block, so
//! every operation runs on tokio's blocking pool. A completion's run phase
//! stays on that pool for its whole duration and feeds the response body
//! through a bounded channel.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use harbor_s3_auth::Authenticated;
use harbor_s3_http::body::S3ResponseBody;
use harbor_s3_http::dispatch::{RequestId, S3Handler};
use harbor_s3_http::response::{empty_response, xml_response};
use harbor_s3_http::router::RoutingContext;
use harbor_s3_model::S3Operation;
use harbor_s3_model::error::S3Error;
use harbor_s3_model::types::CompletedMultipartUpload;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, HOST, LAST_MODIFIED, LOCATION};
use http::{HeaderValue, StatusCode};
use tokio::sync::mpsc;

use crate::keepalive::ChunkSink;
use crate::ops::complete::CompletionTarget;
use crate::ops::multipart::UploadPartRequest;
use crate::provider::HarborS3;

/// Region the gateway reports for the buckets it creates.
const BUCKET_REGION: &str = "x-amz-bucket-region";

/// Chunks buffered between the completion task and the response body.
const COMPLETION_CHANNEL_CAPACITY: usize = 16;

/// Wrapper that implements [`S3Handler`] by delegating to [`HarborS3`] operations.
#[derive(Debug, Clone)]
pub struct HarborHandler(pub HarborS3);

/// Feeds a streamed response body from a blocking task.
#[derive(Debug)]
struct ChannelSink(mpsc::Sender<Bytes>);

impl ChunkSink for ChannelSink {
    fn send_chunk(&mut self, chunk: Bytes) -> bool {
        self.0.blocking_send(chunk).is_ok()
    }
}

impl S3Handler for HarborHandler {
    // One arm per routed operation; each unpacks the routing context and
    // hands off to the blocking pool.
    #[allow(clippy::too_many_lines)]
    fn handle_operation(
        &self,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>> {
        let provider = self.0.clone();
        Box::pin(async move {
            let principal = caller(&provider, &parts)?;
            let bucket = ctx.require_bucket()?.to_owned();

            match op {
                S3Operation::CreateBucket => {
                    let location = format!("/{bucket}");
                    let region = header_value(&provider.config().default_region)?;
                    blocking(move || provider.create_bucket(&bucket, principal.as_deref())).await?;
                    let mut response = empty_response(StatusCode::OK);
                    let headers = response.headers_mut();
                    headers.insert(LOCATION, header_value(&location)?);
                    headers.insert(BUCKET_REGION, region);
                    Ok(response)
                }
                S3Operation::GetObject => {
                    let key = ctx.require_key()?.to_owned();
                    let object =
                        blocking(move || provider.get_object(&bucket, &key, principal.as_deref()))
                            .await?;
                    let last_modified = object
                        .entry
                        .modified
                        .format("%a, %d %b %Y %H:%M:%S GMT")
                        .to_string();
                    let response = http::Response::builder()
                        .status(StatusCode::OK)
                        .header(CONTENT_TYPE, "application/octet-stream")
                        .header(CONTENT_LENGTH, object.body.len())
                        .header(ETAG, object.entry.etag())
                        .header(LAST_MODIFIED, last_modified)
                        .body(S3ResponseBody::from_bytes(object.body))
                        .map_err(|e| S3Error::internal_error(e.to_string()))?;
                    Ok(response)
                }
                S3Operation::CreateMultipartUpload => {
                    let key = ctx.require_key()?.to_owned();
                    let output = blocking(move || {
                        provider.create_multipart_upload(&bucket, &key, principal.as_deref())
                    })
                    .await?;
                    xml_response("InitiateMultipartUploadResult", &output)
                }
                S3Operation::UploadPart => {
                    let key = ctx.require_key()?.to_owned();
                    let upload_id = ctx.require_upload_id()?.to_owned();
                    let part_number = parse_part_number(ctx.query_value("partNumber"))?;
                    let content_md5 = parts
                        .headers
                        .get("content-md5")
                        .and_then(|v| v.to_str().ok())
                        .map(ToOwned::to_owned);
                    let etag = blocking(move || {
                        provider.upload_part(
                            UploadPartRequest {
                                bucket: &bucket,
                                key: &key,
                                upload_id: &upload_id,
                                part_number,
                                body: &body,
                                content_md5: content_md5.as_deref(),
                            },
                            principal.as_deref(),
                        )
                    })
                    .await?;
                    let mut response = empty_response(StatusCode::OK);
                    response.headers_mut().insert(ETAG, header_value(&etag)?);
                    Ok(response)
                }
                S3Operation::CompleteMultipartUpload => {
                    let request: CompletedMultipartUpload = harbor_s3_xml::from_xml(&body)
                        .map_err(|e| S3Error::malformed_xml(e.to_string()))?;
                    let target = CompletionTarget {
                        key: ctx.require_key()?.to_owned(),
                        upload_id: ctx.require_upload_id()?.to_owned(),
                        location: location_of(&parts),
                        request_id: parts
                            .extensions
                            .get::<RequestId>()
                            .map(|id| id.0.clone())
                            .unwrap_or_default(),
                        bucket,
                    };
                    let job = blocking(move || {
                        provider.prepare_complete(target, &request.parts, principal.as_deref())
                    })
                    .await?;

                    let (tx, body) = S3ResponseBody::channel(COMPLETION_CHANNEL_CAPACITY);
                    tokio::task::spawn_blocking(move || {
                        job.run(ChannelSink(tx));
                    });
                    http::Response::builder()
                        .status(StatusCode::OK)
                        .header(CONTENT_TYPE, "application/xml")
                        .body(body)
                        .map_err(|e| S3Error::internal_error(e.to_string()))
                }
                S3Operation::AbortMultipartUpload => {
                    let key = ctx.require_key()?.to_owned();
                    let upload_id = ctx.require_upload_id()?.to_owned();
                    blocking(move || {
                        provider.abort_multipart_upload(
                            &bucket,
                            &key,
                            &upload_id,
                            principal.as_deref(),
                        )
                    })
                    .await?;
                    Ok(empty_response(StatusCode::NO_CONTENT))
                }
            }
        })
    }
}

/// The principal whose ownership is enforced, or `None` when validation is skipped.
fn caller(
    provider: &HarborS3,
    parts: &http::request::Parts,
) -> Result<Option<String>, S3Error> {
    if provider.config().s3_skip_signature_validation {
        return Ok(None);
    }
    parts
        .extensions
        .get::<Authenticated>()
        .map(|auth| Some(auth.principal.id.clone()))
        .ok_or_else(|| S3Error::access_denied(parts.uri.path()))
}

/// Run a store-bound operation on the blocking pool.
async fn blocking<T, F>(op: F) -> Result<T, S3Error>
where
    F: FnOnce() -> Result<T, S3Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| S3Error::internal_error(format!("operation task failed: {e}")))?
}

fn parse_part_number(value: Option<&str>) -> Result<u32, S3Error> {
    value.and_then(|v| v.parse().ok()).ok_or_else(|| {
        S3Error::invalid_argument("Part number must be an integer between 1 and 10000, inclusive")
    })
}

/// `http://{host}{path}`, or the bare path when the request had no `Host`.
fn location_of(parts: &http::request::Parts) -> String {
    let path = parts.uri.path();
    parts
        .headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map_or_else(|| path.to_owned(), |host| format!("http://{host}{path}"))
}

fn header_value(value: &str) -> Result<HeaderValue, S3Error> {
    HeaderValue::from_str(value).map_err(|e| S3Error::internal_error(e.to_string()))
}
