//! The main S3 HTTP service implementing hyper's `Service` trait.
//!
//! [`S3HttpService`] ties together routing, authentication, dispatch, and response
//! serialization into a single hyper-compatible service. It handles:
//!
//! 1. Health check interception (`GET /_health`)
//! 2. S3 request routing via [`S3Router`]
//! 3. The SigV4 authentication gate
//! 4. Request body collection and `x-amz-content-sha256` verification
//! 5. Operation dispatch to the [`S3Handler`]
//! 6. Common response headers (`x-amz-request-id`, `Server`)
//! 7. Error response formatting

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use harbor_s3_auth::{AuthError, SigV4Authenticator};
use harbor_s3_model::error::{S3Error, S3ErrorCode};
use http_body_util::BodyExt;
use hyper::service::Service;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::body::S3ResponseBody;
use crate::dispatch::{RequestId, S3Handler, dispatch_operation};
use crate::response::error_to_response;
use crate::router::S3Router;

/// Configuration for the S3 HTTP service.
#[derive(Debug, Clone, Default)]
pub struct S3HttpConfig {
    /// Whether to skip SigV4 signature validation (useful for development).
    pub skip_signature_validation: bool,
    /// Verifies signed requests. Without one, every request is rejected
    /// unless validation is skipped.
    pub authenticator: Option<SigV4Authenticator>,
}

/// The S3 HTTP service that implements hyper's `Service` trait.
///
/// # Type Parameters
///
/// - `H`: The business logic handler implementing [`S3Handler`].
pub struct S3HttpService<H: S3Handler> {
    handler: Arc<H>,
    router: S3Router,
    config: Arc<S3HttpConfig>,
}

impl<H: S3Handler> fmt::Debug for S3HttpService<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3HttpService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H: S3Handler> S3HttpService<H> {
    /// Create a new S3 HTTP service with the given handler and configuration.
    #[must_use]
    pub fn new(handler: H, config: S3HttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a new S3 HTTP service from an `Arc<H>` handler and configuration.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: S3HttpConfig) -> Self {
        Self {
            handler,
            router: S3Router,
            config: Arc::new(config),
        }
    }
}

impl<H: S3Handler> Clone for S3HttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router,
            config: Arc::clone(&self.config),
        }
    }
}

impl<H, B> Service<http::Request<B>> for S3HttpService<H>
where
    H: S3Handler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: fmt::Display,
{
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let router = self.router;
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let response =
                process_request(req, handler.as_ref(), router, &config, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

/// Process an incoming HTTP request through the S3 pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    router: S3Router,
    config: &S3HttpConfig,
    request_id: &str,
) -> http::Response<S3ResponseBody>
where
    H: S3Handler,
    B: http_body::Body,
    B::Error: fmt::Display,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing S3 request");

    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route S3 request");
            return error_to_response(&err, request_id);
        }
    };

    info!(
        operation = %ctx.operation,
        bucket = ?ctx.bucket,
        key = ?ctx.key,
        request_id,
        "routed S3 request"
    );

    let (mut parts, incoming) = req.into_parts();

    if let Err(err) = authenticate_request(&mut parts, config) {
        return error_to_response(&err, request_id);
    }

    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            error!(error = %err, request_id, "failed to collect request body");
            let s3_err = S3Error::new(S3ErrorCode::IncompleteBody);
            return error_to_response(&s3_err, request_id);
        }
    };

    if let Err(s3_err) = validate_content_sha256(&parts, &body) {
        warn!(error = %s3_err.message, request_id, "content SHA256 mismatch");
        return error_to_response(&s3_err, request_id);
    }

    parts.extensions.insert(RequestId(request_id.to_owned()));

    match dispatch_operation(handler, parts, body, ctx).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "S3 operation returned error");
            error_to_response(&err, request_id)
        }
    }
}

/// Run the SigV4 gate and stash the authenticated caller in the request extensions.
fn authenticate_request(
    parts: &mut http::request::Parts,
    config: &S3HttpConfig,
) -> Result<(), S3Error> {
    if config.skip_signature_validation {
        return Ok(());
    }

    let Some(authenticator) = config.authenticator.as_ref() else {
        warn!("no authenticator configured, rejecting request");
        return Err(S3Error::access_denied(parts.uri.path()));
    };

    match authenticator.authenticate(parts) {
        Ok(Some(authenticated)) => {
            debug!(principal = %authenticated.principal.id, "request authenticated");
            parts.extensions.insert(authenticated);
            Ok(())
        }
        Ok(None) => {
            warn!(uri = %parts.uri, "anonymous request rejected");
            Err(S3Error::access_denied(parts.uri.path()))
        }
        Err(err) => {
            warn!(error = %err, "authentication failed");
            Err(auth_error_to_s3(&err))
        }
    }
}

/// Map an authentication failure onto the S3 error a client sees.
///
/// Only three outcomes are visible on the wire: unknown access key, expired
/// presigned URL, and malformed authorization for everything else, signature
/// mismatches included.
#[must_use]
pub fn auth_error_to_s3(err: &AuthError) -> S3Error {
    match err {
        AuthError::UnknownAccessKey(access_key_id) => {
            S3Error::invalid_access_key_id(access_key_id.clone())
        }
        AuthError::RequestExpired => {
            S3Error::with_message(S3ErrorCode::AccessDenied, "Request has expired")
        }
        other => S3Error::authorization_header_malformed(other.to_string()),
    }
}

/// Validate the `X-Amz-Content-Sha256` header against the request body.
///
/// Streaming and unsigned placeholders are accepted as-is; a concrete value
/// must be 64 hex digits matching the body's SHA-256.
fn validate_content_sha256(parts: &http::request::Parts, body: &Bytes) -> Result<(), S3Error> {
    let Some(header_value) = parts.headers.get("x-amz-content-sha256") else {
        return Ok(());
    };

    let hash_str = header_value.to_str().map_err(|_| {
        S3Error::with_message(
            S3ErrorCode::XAmzContentSHA256Mismatch,
            "Invalid X-Amz-Content-Sha256 header encoding",
        )
    })?;

    if matches!(
        hash_str,
        "UNSIGNED-PAYLOAD"
            | "STREAMING-AWS4-HMAC-SHA256-PAYLOAD"
            | "STREAMING-AWS4-HMAC-SHA256-PAYLOAD-TRAILER"
            | "STREAMING-UNSIGNED-PAYLOAD-TRAILER"
    ) {
        return Ok(());
    }

    if hash_str.len() != 64 || !hash_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(S3Error::with_message(
            S3ErrorCode::XAmzContentSHA256Mismatch,
            format!("The provided 'x-amz-content-sha256' header is not valid: {hash_str}"),
        ));
    }

    let actual = hex::encode(Sha256::digest(body));
    if !actual.eq_ignore_ascii_case(hash_str) {
        return Err(S3Error::with_message(
            S3ErrorCode::XAmzContentSHA256Mismatch,
            "The provided 'x-amz-content-sha256' header does not match what was computed",
        ));
    }

    Ok(())
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/_health" || path == "/health")
}

fn health_check_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(S3ResponseBody::from_string(
            r#"{"status":"running","service":"s3"}"#,
        ))
        .expect("static health response should be valid")
}

/// Add common response headers to every S3 response.
fn add_common_headers(
    mut response: http::Response<S3ResponseBody>,
    request_id: &str,
) -> http::Response<S3ResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv.clone());
        headers.insert("x-amz-id-2", hv);
    }

    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static("HarborS3"),
    );

    response
}
