//! The gateway provider.
//!
//! [`HarborS3`] owns the storage collaborators and the configuration.
//! Individual operations are implemented in the [`crate::ops`] submodules as
//! synchronous methods; [`crate::handler`] bridges them to the HTTP layer by
//! running them on tokio's blocking pool.

use std::fmt;
use std::sync::Arc;

use crate::config::S3Config;
use crate::store::{ByteStore, InMemoryByteStore, InMemoryMetadataStore, MetadataStore};

/// Owner recorded for buckets created while signature validation is skipped.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// The gateway provider.
///
/// All fields are `Arc`-wrapped for cheap cloning and shared ownership
/// across handler tasks.
///
/// # Examples
///
/// ```
/// use harbor_s3_core::HarborS3;
/// use harbor_s3_core::config::S3Config;
///
/// let provider = HarborS3::new(S3Config::default());
/// assert_eq!(provider.config().s3_default_pool, "harbor");
/// ```
#[derive(Clone)]
pub struct HarborS3 {
    /// Bucket, object, session, and part records.
    pub(crate) metadata: Arc<dyn MetadataStore>,
    /// Object and part bytes.
    pub(crate) bytes: Arc<dyn ByteStore>,
    /// Provider configuration.
    pub(crate) config: Arc<S3Config>,
}

impl fmt::Debug for HarborS3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarborS3")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HarborS3 {
    /// Create a provider backed by in-memory stores.
    #[must_use]
    pub fn new(config: S3Config) -> Self {
        Self::with_stores(
            config,
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryByteStore::new()),
        )
    }

    /// Create a provider over the given stores.
    #[must_use]
    pub fn with_stores(
        config: S3Config,
        metadata: Arc<dyn MetadataStore>,
        bytes: Arc<dyn ByteStore>,
    ) -> Self {
        Self {
            metadata,
            bytes,
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the provider configuration.
    #[must_use]
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Returns the metadata store.
    #[must_use]
    pub fn metadata(&self) -> &dyn MetadataStore {
        self.metadata.as_ref()
    }

    /// Returns the byte store.
    #[must_use]
    pub fn bytes(&self) -> &dyn ByteStore {
        self.bytes.as_ref()
    }
}
