//! S3 operation dispatch: routes a resolved operation to the business logic handler.
//!
//! By the time [`dispatch_operation`] runs, the service has routed the request,
//! passed the authentication gate, and collected the body. The authenticated
//! caller, when there is one, travels in the request extensions as
//! [`Authenticated`](harbor_s3_auth::Authenticated), next to the [`RequestId`].

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use harbor_s3_model::S3Operation;
use harbor_s3_model::error::{S3Error, S3ErrorCode};

use crate::body::S3ResponseBody;
use crate::router::RoutingContext;

/// The per-request id the service assigns, available in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Trait that the business logic provider must implement.
///
/// This is the boundary between the HTTP layer and the gateway's storage
/// logic. Returned futures are boxed so the service can hold handlers behind
/// an `Arc`.
pub trait S3Handler: Send + Sync + 'static {
    /// Handle an S3 operation and produce an HTTP response.
    fn handle_operation(
        &self,
        op: S3Operation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>>;
}

/// Dispatch a routed S3 request to the handler.
pub async fn dispatch_operation<H: S3Handler>(
    handler: &H,
    parts: http::request::Parts,
    body: Bytes,
    ctx: RoutingContext,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let op = ctx.operation;
    tracing::debug!(operation = %op, bucket = ?ctx.bucket, key = ?ctx.key, "dispatching S3 operation");
    handler.handle_operation(op, parts, body, ctx).await
}

/// A handler that returns `NotImplemented` for every operation.
///
/// Useful for testing routing and the authentication gate in isolation.
#[derive(Debug, Clone, Default)]
pub struct NotImplementedHandler;

impl S3Handler for NotImplementedHandler {
    fn handle_operation(
        &self,
        op: S3Operation,
        _parts: http::request::Parts,
        _body: Bytes,
        _ctx: RoutingContext,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<S3ResponseBody>, S3Error>> + Send>> {
        Box::pin(async move {
            Err(S3Error::with_message(
                S3ErrorCode::NotImplemented,
                format!("{op} is not implemented"),
            ))
        })
    }
}
