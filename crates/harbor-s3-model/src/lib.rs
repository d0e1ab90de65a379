//! S3 wire model shared by the Harbor gateway crates.
//!
//! Holds the error taxonomy returned to clients, the set of routed operations,
//! and the request/response shapes of the multipart upload API.

pub mod error;
pub mod operations;
pub mod types;

pub use error::{S3Error, S3ErrorCode};
pub use operations::S3Operation;
