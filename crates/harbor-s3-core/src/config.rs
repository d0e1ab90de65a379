//! Gateway configuration.
//!
//! Provides [`S3Config`] for configuring the Harbor S3 gateway. Values are
//! loaded from environment variables with the defaults listed on
//! [`S3Config::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// S3 gateway configuration.
///
/// # Examples
///
/// ```
/// use harbor_s3_core::config::S3Config;
///
/// let config = S3Config::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:4566");
/// assert_eq!(config.s3_min_part_size, 5 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct S3Config {
    /// Bind address for the gateway (e.g. `"0.0.0.0:4566"`).
    #[builder(default = String::from("0.0.0.0:4566"))]
    pub gateway_listen: String,

    /// Whether to skip signature validation on incoming requests.
    #[builder(default = false)]
    pub s3_skip_signature_validation: bool,

    /// Minimum size of every completed part except the last one.
    #[builder(default = 5_242_880)]
    pub s3_min_part_size: u64,

    /// Maximum size of a single uploaded part.
    #[builder(default = 2_147_483_648)]
    pub s3_max_part_size: u64,

    /// Seconds of silence after which a streamed completion emits a keep-alive unit.
    #[builder(default = 10)]
    pub s3_keep_alive_interval_secs: u64,

    /// Storage pool assigned to newly created buckets.
    #[builder(default = String::from("harbor"))]
    pub s3_default_pool: String,

    /// Region reported in `x-amz-bucket-region` when a bucket is created.
    #[builder(default = String::from("us-east-1"))]
    pub default_region: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:4566"),
            s3_skip_signature_validation: false,
            s3_min_part_size: 5_242_880,
            s3_max_part_size: 2_147_483_648,
            s3_keep_alive_interval_secs: 10,
            s3_default_pool: String::from("harbor"),
            default_region: String::from("us-east-1"),
            log_level: String::from("info"),
        }
    }
}

impl S3Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:4566` |
    /// | `S3_SKIP_SIGNATURE_VALIDATION` | `false` |
    /// | `S3_MIN_PART_SIZE` | `5242880` |
    /// | `S3_MAX_PART_SIZE` | `2147483648` |
    /// | `S3_KEEP_ALIVE_INTERVAL_SECS` | `10` |
    /// | `S3_DEFAULT_POOL` | `harbor` |
    /// | `DEFAULT_REGION` | `us-east-1` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// Unparseable numbers keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("S3_SKIP_SIGNATURE_VALIDATION") {
            config.s3_skip_signature_validation = parse_bool(&v);
        }
        if let Some(n) = env_u64("S3_MIN_PART_SIZE") {
            config.s3_min_part_size = n;
        }
        if let Some(n) = env_u64("S3_MAX_PART_SIZE") {
            config.s3_max_part_size = n;
        }
        if let Some(n) = env_u64("S3_KEEP_ALIVE_INTERVAL_SECS") {
            config.s3_keep_alive_interval_secs = n;
        }
        if let Ok(v) = std::env::var("S3_DEFAULT_POOL") {
            config.s3_default_pool = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_REGION") {
            config.default_region = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// The keep-alive cadence as a [`Duration`].
    #[must_use]
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.s3_keep_alive_interval_secs)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
