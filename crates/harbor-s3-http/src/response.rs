//! HTTP response construction for S3 replies.
//!
//! Success payloads are XML documents built through [`S3Serialize`]; failures
//! are `<Error>` documents whose status comes from the [`S3Error`].

use bytes::Bytes;
use harbor_s3_model::error::S3Error;
use harbor_s3_xml::S3Serialize;

use crate::body::S3ResponseBody;

/// Serialize `value` as an XML document under `root` and wrap it in a 200 response.
///
/// # Errors
///
/// Returns `InternalError` if the XML writer fails.
pub fn xml_response<T: S3Serialize>(
    root: &str,
    value: &T,
) -> Result<http::Response<S3ResponseBody>, S3Error> {
    let xml = harbor_s3_xml::to_xml(root, value)
        .map_err(|e| S3Error::internal_error(format!("Failed to serialize {root}: {e}")))?;
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Content-Type", "application/xml")
        .body(S3ResponseBody::from_xml(xml))
        .map_err(|e| S3Error::internal_error(e.to_string()))
}

/// Build a bodiless response with the given status.
#[must_use]
pub fn empty_response(status: http::StatusCode) -> http::Response<S3ResponseBody> {
    let mut response = http::Response::new(S3ResponseBody::empty());
    *response.status_mut() = status;
    response
}

/// Convert an [`S3Error`] into an HTTP error response with an XML body.
#[must_use]
pub fn error_to_response(err: &S3Error, request_id: &str) -> http::Response<S3ResponseBody> {
    let xml_bytes = harbor_s3_xml::error_to_xml(
        err.code.as_str(),
        &err.message,
        err.resource.as_deref(),
        request_id,
    );

    let mut response = http::Response::new(S3ResponseBody::from_bytes(Bytes::from(xml_bytes)));
    *response.status_mut() = err.status_code;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/xml"),
    );
    response
}

#[cfg(test)]
mod tests {
    use harbor_s3_model::S3ErrorCode;
    use harbor_s3_model::types::CreateMultipartUploadOutput;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_string(response: http::Response<S3ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_should_render_error_with_status_and_code() {
        let err = S3Error::no_such_upload("upload-1");
        let response = error_to_response(&err, "req-1");

        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
        let body = body_string(response).await;
        assert!(body.starts_with("<?xml"));
        assert!(body.contains("<Code>NoSuchUpload</Code>"));
        assert!(body.contains("<Resource>upload-1</Resource>"));
        assert!(body.contains("<RequestId>req-1</RequestId>"));
    }

    #[tokio::test]
    async fn test_should_render_initiate_result() {
        let output = CreateMultipartUploadOutput {
            bucket: "photos".to_owned(),
            key: "big.bin".to_owned(),
            upload_id: "u-1".to_owned(),
        };
        let response = xml_response("InitiateMultipartUploadResult", &output).unwrap();

        assert_eq!(response.status(), http::StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<UploadId>u-1</UploadId>"));
    }

    #[test]
    fn test_should_build_empty_no_content_response() {
        let response = empty_response(http::StatusCode::NO_CONTENT);
        assert_eq!(response.status(), http::StatusCode::NO_CONTENT);
        assert_eq!(
            S3Error::new(S3ErrorCode::NoSuchKey).status_code,
            http::StatusCode::NOT_FOUND
        );
    }
}
