//! S3 HTTP routing, authentication gate, response bodies, and hyper service.
//!
//! This crate provides the HTTP layer of the Harbor S3 gateway:
//!
//! - **Routing** ([`router`]): Maps path-style HTTP requests to S3 operations by
//!   examining method, path, and multipart query parameters.
//!
//! - **Response construction** ([`response`]): XML success payloads, empty
//!   replies, and `<Error>` documents.
//!
//! - **Dispatch** ([`dispatch`]): Routes identified S3 operations to the business
//!   logic handler via the [`S3Handler`](dispatch::S3Handler) trait.
//!
//! - **Service** ([`service`]): The main [`S3HttpService`](service::S3HttpService)
//!   that implements hyper's `Service` trait, tying routing, the SigV4 gate,
//!   and dispatch together.
//!
//! - **Body** ([`body`]): The [`S3ResponseBody`](body::S3ResponseBody) type
//!   supporting buffered, streaming, and empty response modes.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> S3HttpService (hyper Service)
//!     -> Health check interception
//!     -> S3Router (operation identification)
//!     -> SigV4 authentication gate
//!     -> Body collection + x-amz-content-sha256 check
//!     -> dispatch_operation (S3Handler trait)
//!     -> Common response headers (x-amz-request-id, Server)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use harbor_s3_http::service::{S3HttpConfig, S3HttpService};
//! use harbor_s3_http::dispatch::NotImplementedHandler;
//!
//! let config = S3HttpConfig::default();
//! let service = S3HttpService::new(NotImplementedHandler, config);
//! // Use `service` with a hyper server.
//! ```

// S3Error is the wire error type used pervasively as Result<T, S3Error>.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod response;
pub mod router;
pub mod service;

pub use body::S3ResponseBody;
pub use dispatch::{NotImplementedHandler, RequestId, S3Handler};
pub use response::{empty_response, error_to_response, xml_response};
pub use router::{RoutingContext, S3Router};
pub use service::{S3HttpConfig, S3HttpService, auth_error_to_s3};
