//! Error types for SigV4 authentication.
//!
//! Callers only ever surface three outcomes to clients: malformed
//! authorization, unknown access key, and expired request. The finer variants
//! exist so the rejection reason shows up in logs.

/// Errors that can occur during AWS Signature Version 4 authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The `Authorization` header or presigned query could not be parsed.
    #[error("Invalid authorization format: {0}")]
    Malformed(String),

    /// The signing algorithm is not supported (only AWS4-HMAC-SHA256 is supported).
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The `Credential` component is not `AKID/date/region/service/terminator`.
    #[error("Invalid credential format: {0}")]
    InvalidCredential(String),

    /// The request timestamp could not be parsed.
    #[error("Invalid request timestamp: {0}")]
    InvalidTimestamp(String),

    /// A header named in `SignedHeaders` is missing from the request.
    #[error("Missing signed header: {0}")]
    MissingHeader(String),

    /// The `X-Amz-Content-SHA256` header is missing.
    #[error("Missing x-amz-content-sha256 header")]
    MissingPayloadHash,

    /// The access key is unknown, or it or its owner is inactive.
    #[error("Unknown access key: {0}")]
    UnknownAccessKey(String),

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureMismatch,

    /// The presigned URL has expired (current time exceeds `X-Amz-Date` + `X-Amz-Expires`).
    #[error("Request has expired")]
    RequestExpired,
}

impl AuthError {
    /// Whether this failure is reported to clients as a malformed authorization.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::UnknownAccessKey(_) | Self::RequestExpired)
    }
}
