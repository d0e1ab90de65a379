//! Gateway operations.
//!
//! Each submodule adds methods to [`crate::provider::HarborS3`]. Methods take
//! the calling principal's id, or `None` when ownership is not enforced, and
//! perform blocking store calls.
//!
//! - [`bucket`]: bucket creation and the ownership check.
//! - [`multipart`]: upload initiation and part uploads.
//! - [`complete`]: the two-phase completion that assembles an object.
//! - [`abort`]: upload abort.
//! - [`cleanup`]: the part cleanup primitive shared by completion and abort.
//! - [`object`]: reading assembled objects back.

pub mod abort;
pub mod bucket;
pub mod cleanup;
pub mod complete;
pub mod multipart;
pub mod object;
