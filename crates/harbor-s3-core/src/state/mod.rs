//! Gateway records: buckets, objects, upload sessions, and parts.
//!
//! These are plain values. Persisting them is the job of a
//! [`MetadataStore`](crate::store::MetadataStore).

pub mod bucket;
pub mod multipart;
pub mod object;

pub use bucket::{Bucket, SharePermission};
pub use multipart::{PartEntry, UploadSession, UploadState};
pub use object::ObjectEntry;
