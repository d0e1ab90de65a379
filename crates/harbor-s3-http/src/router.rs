//! Path-style S3 request routing.
//!
//! The [`S3Router`] maps incoming HTTP requests to S3 operations by examining
//! the HTTP method, whether a bucket and key are present in the path, and the
//! query parameters that mark multipart sub-resources (`?uploads`,
//! `?uploadId`, `?partNumber`).
//!
//! Paths have the form `/{bucket}` or `/{bucket}/{key...}`.

use harbor_s3_model::error::{S3Error, S3ErrorCode};
use harbor_s3_model::operations::S3Operation;
use http::Method;
use percent_encoding::percent_decode_str;

/// Maps requests onto [`S3Operation`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct S3Router;

/// The result of routing an HTTP request to an S3 operation.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The resolved bucket name, if any.
    pub bucket: Option<String>,
    /// The resolved object key, if any.
    pub key: Option<String>,
    /// The identified S3 operation.
    pub operation: S3Operation,
    /// Parsed query parameters from the request URI.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// Get the value of a query parameter by name.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        query_value(&self.query_params, name)
    }

    /// The bucket name, or an `InvalidRequest` error when the path had none.
    pub fn require_bucket(&self) -> Result<&str, S3Error> {
        self.bucket
            .as_deref()
            .ok_or_else(|| S3Error::invalid_request("Bucket name is required"))
    }

    /// The object key, or an `InvalidRequest` error when the path had none.
    pub fn require_key(&self) -> Result<&str, S3Error> {
        self.key
            .as_deref()
            .ok_or_else(|| S3Error::invalid_request("Object key is required"))
    }

    /// The `uploadId` query parameter, or an `InvalidRequest` error.
    pub fn require_upload_id(&self) -> Result<&str, S3Error> {
        self.query_value("uploadId")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| S3Error::invalid_request("uploadId is required"))
    }
}

impl S3Router {
    /// Resolve an HTTP request to a routing context.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotAllowed` when the method and path shape do not name
    /// an operation this gateway serves.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, S3Error> {
        let uri = req.uri();
        let query_params = parse_query_params(uri.query().unwrap_or(""));
        let (bucket, key) = parse_path(uri.path());

        let operation =
            identify_operation(req.method(), bucket.as_ref(), key.as_ref(), &query_params)?;

        Ok(RoutingContext {
            bucket,
            key,
            operation,
            query_params,
        })
    }
}

/// Parse the URI path into an optional bucket and optional key.
fn parse_path(path: &str) -> (Option<String>, Option<String>) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return (None, None);
    }

    if let Some(pos) = trimmed.find('/') {
        let bucket = decode_uri_component(&trimmed[..pos]);
        let key_raw = &trimmed[pos + 1..];
        let key = if key_raw.is_empty() {
            None
        } else {
            Some(decode_uri_component(key_raw))
        };
        (Some(bucket), key)
    } else {
        (Some(decode_uri_component(trimmed)), None)
    }
}

/// Decode a percent-encoded URI component.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into key-value pairs.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }

    query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            if let Some(pos) = pair.find('=') {
                let key = decode_uri_component(&pair[..pos]);
                let value = decode_uri_component(&pair[pos + 1..]);
                (key, value)
            } else {
                (decode_uri_component(pair), String::new())
            }
        })
        .collect()
}

fn query_has_key(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn identify_operation(
    method: &Method,
    bucket: Option<&String>,
    key: Option<&String>,
    params: &[(String, String)],
) -> Result<S3Operation, S3Error> {
    match (method, bucket.is_some(), key.is_some()) {
        (&Method::PUT, true, false) => Ok(S3Operation::CreateBucket),
        (method, true, true) => identify_object_operation(method, params),
        (_, false, true) => Err(S3Error::with_message(
            S3ErrorCode::InvalidRequest,
            "Object key specified without bucket",
        )),
        (method, _, _) => Err(S3Error::method_not_allowed(method.as_str())),
    }
}

fn identify_object_operation(
    method: &Method,
    params: &[(String, String)],
) -> Result<S3Operation, S3Error> {
    let has_upload_id = query_has_key(params, "uploadId");
    match *method {
        Method::GET if !has_upload_id => Ok(S3Operation::GetObject),
        Method::PUT if has_upload_id && query_has_key(params, "partNumber") => {
            Ok(S3Operation::UploadPart)
        }
        Method::POST if query_has_key(params, "uploads") => {
            Ok(S3Operation::CreateMultipartUpload)
        }
        Method::POST if has_upload_id => Ok(S3Operation::CompleteMultipartUpload),
        Method::DELETE if has_upload_id => Ok(S3Operation::AbortMultipartUpload),
        _ => Err(S3Error::method_not_allowed(method.as_str())),
    }
}
