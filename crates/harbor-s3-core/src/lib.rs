//! Multipart assembly, abort, and part cleanup for the Harbor S3 gateway.
//!
//! This crate holds the gateway's storage-facing logic: bucket and upload
//! records, part uploads, the two-phase completion that assembles an object
//! from its parts, upload abort, and the cleanup primitive both of them share.
//!
//! # Architecture
//!
//! ```text
//! harbor-s3-http (routing, SigV4 gate, dispatch)
//!        |
//!        v
//! HarborHandler (S3Handler impl, blocking pool bridge)
//!        |
//!        v
//! HarborS3 (ops: bucket, multipart, complete, abort, object)
//!        |
//!        v
//! MetadataStore + ByteStore (in-memory by default)
//! ```
//!
//! A completion answers with a streamed body. While parts are combined the
//! stream carries keep-alive units so clients do not time out; the final
//! chunk is either the result document or an `<Error>` document.

// S3Error is the wire error type used pervasively as Result<T, S3Error>.
#![allow(clippy::result_large_err)]

pub mod checksums;
pub mod config;
pub mod error;
pub mod handler;
pub mod keepalive;
pub mod ops;
pub mod provider;
pub mod state;
pub mod store;

pub use config::S3Config;
pub use handler::HarborHandler;
pub use provider::HarborS3;
