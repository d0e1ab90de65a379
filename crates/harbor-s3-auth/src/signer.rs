//! Client-side SigV4 signing.
//!
//! Produces requests that [`SigV4Authenticator`](crate::sigv4::SigV4Authenticator)
//! accepts. Used by the gateway's own tests and by tooling that talks to the
//! gateway without an AWS SDK.

use chrono::{DateTime, Utc};
use http::HeaderValue;

use crate::canonical::{
    build_canonical_headers, build_canonical_query_string, build_canonical_request,
};
use crate::error::AuthError;
use crate::sigv4::{
    AMZ_DATE_FORMAT, SUPPORTED_ALGORITHM, build_string_to_sign, compute_signature,
    derive_signing_key, hash_payload,
};

/// Signs requests with one access key.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    access_key_id: String,
    secret_key: String,
    region: String,
    service: String,
}

impl RequestSigner {
    /// Create a signer for the given key and scope.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Sign `parts` with an `Authorization` header.
    ///
    /// Sets `x-amz-date` and `x-amz-content-sha256`, signs those plus `host`
    /// when present, and returns the hex signature.
    pub fn sign(
        &self,
        parts: &mut http::request::Parts,
        payload_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let timestamp = at.format(AMZ_DATE_FORMAT).to_string();
        parts
            .headers
            .insert("x-amz-date", header_value(timestamp.clone())?);
        parts
            .headers
            .insert("x-amz-content-sha256", header_value(payload_hash.to_owned())?);

        let names = signed_names(parts, &["x-amz-content-sha256", "x-amz-date"]);
        let canonical_query =
            build_canonical_query_string(parts.uri.query().unwrap_or_default(), &[]);
        let signature =
            self.signature_for(parts, &names, &canonical_query, payload_hash, &timestamp);

        let authorization = format!(
            "{SUPPORTED_ALGORITHM} Credential={}/{},SignedHeaders={},Signature={signature}",
            self.access_key_id,
            self.scope(&timestamp),
            names.join(";"),
        );
        parts
            .headers
            .insert(http::header::AUTHORIZATION, header_value(authorization)?);
        Ok(signature)
    }

    /// Presign `parts` by appending the `X-Amz-*` query parameters.
    ///
    /// The payload hash is still sent as the `x-amz-content-sha256` header.
    pub fn presign(
        &self,
        parts: &mut http::request::Parts,
        payload_hash: &str,
        expires_secs: u64,
        at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let timestamp = at.format(AMZ_DATE_FORMAT).to_string();
        parts
            .headers
            .insert("x-amz-content-sha256", header_value(payload_hash.to_owned())?);

        let names = signed_names(parts, &["x-amz-content-sha256"]);
        let credential = format!("{}/{}", self.access_key_id, self.scope(&timestamp));

        let mut query = form_urlencoded::Serializer::for_suffix(
            parts.uri.query().map(ToOwned::to_owned).unwrap_or_default(),
            0,
        );
        query
            .append_pair("X-Amz-Algorithm", SUPPORTED_ALGORITHM)
            .append_pair("X-Amz-Credential", &credential)
            .append_pair("X-Amz-Date", &timestamp)
            .append_pair("X-Amz-Expires", &expires_secs.to_string())
            .append_pair("X-Amz-SignedHeaders", &names.join(";"));
        let unsigned_query = query.finish();

        let canonical_query = build_canonical_query_string(&unsigned_query, &[]);
        let signature =
            self.signature_for(parts, &names, &canonical_query, payload_hash, &timestamp);

        let path_and_query = format!(
            "{}?{unsigned_query}&X-Amz-Signature={signature}",
            parts.uri.path()
        );
        parts.uri = path_and_query
            .parse()
            .map_err(|e| AuthError::Malformed(format!("invalid presigned URI: {e}")))?;
        Ok(signature)
    }

    fn scope(&self, timestamp: &str) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            &timestamp[..8],
            self.region,
            self.service
        )
    }

    fn signature_for(
        &self,
        parts: &http::request::Parts,
        names: &[String],
        canonical_query: &str,
        payload_hash: &str,
        timestamp: &str,
    ) -> String {
        let headers: Vec<(&str, &str)> = names
            .iter()
            .map(|name| {
                let value = parts
                    .headers
                    .get(name.as_str())
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                (name.as_str(), value)
            })
            .collect();
        let canonical = build_canonical_request(
            parts.method.as_str(),
            parts.uri.path(),
            canonical_query,
            &build_canonical_headers(&headers),
            &names.join(";"),
            payload_hash,
        );
        let string_to_sign = build_string_to_sign(
            timestamp,
            &self.scope(timestamp),
            &hash_payload(canonical.as_bytes()),
        );
        let key = derive_signing_key(&self.secret_key, &timestamp[..8], &self.region, &self.service);
        compute_signature(&key, &string_to_sign)
    }
}

fn signed_names(parts: &http::request::Parts, required: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = required.iter().map(|n| (*n).to_owned()).collect();
    if parts.headers.contains_key(http::header::HOST) {
        names.push("host".to_owned());
    }
    names.sort_unstable();
    names
}

fn header_value(value: String) -> Result<HeaderValue, AuthError> {
    HeaderValue::try_from(value).map_err(|e| AuthError::Malformed(e.to_string()))
}
