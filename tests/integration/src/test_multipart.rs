//! Multipart upload integration tests.

#[cfg(test)]
mod tests {
    use aws_sdk_s3::error::ProvideErrorMetadata;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};

    use crate::{create_test_bucket, s3_client};

    const MIN_PART: usize = 5 * 1024 * 1024;

    async fn start(client: &aws_sdk_s3::Client, bucket: &str, key: &str) -> String {
        client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .expect("create_multipart_upload")
            .upload_id()
            .expect("upload_id")
            .to_owned()
    }

    async fn put_part(
        client: &aws_sdk_s3::Client,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Vec<u8>,
    ) -> CompletedPart {
        let out = client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .expect("upload_part");
        CompletedPart::builder()
            .part_number(part_number)
            .e_tag(out.e_tag().unwrap_or_default())
            .build()
    }

    fn manifest(parts: Vec<CompletedPart>) -> CompletedMultipartUpload {
        CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_complete_multipart_upload() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "mpu").await;
        let upload_id = start(&client, &bucket, "multipart.bin").await;

        let parts = vec![
            put_part(&client, &bucket, "multipart.bin", &upload_id, 1, vec![0xAA; MIN_PART]).await,
            put_part(&client, &bucket, "multipart.bin", &upload_id, 2, vec![0xBB; 1024]).await,
        ];

        let complete = client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key("multipart.bin")
            .upload_id(&upload_id)
            .multipart_upload(manifest(parts))
            .send()
            .await
            .expect("complete_multipart_upload");
        assert!(complete.e_tag().unwrap_or_default().ends_with("-2\""));

        let resp = client
            .get_object()
            .bucket(&bucket)
            .key("multipart.bin")
            .send()
            .await
            .expect("get multipart object");
        let data = resp.body.collect().await.expect("collect").into_bytes();
        assert_eq!(data.len(), MIN_PART + 1024);
        assert!(data[..MIN_PART].iter().all(|&b| b == 0xAA));
        assert!(data[MIN_PART..].iter().all(|&b| b == 0xBB));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_abort_multipart_upload() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "abort").await;
        let upload_id = start(&client, &bucket, "aborted.bin").await;
        let part = put_part(&client, &bucket, "aborted.bin", &upload_id, 1, vec![1; 1024]).await;

        client
            .abort_multipart_upload()
            .bucket(&bucket)
            .key("aborted.bin")
            .upload_id(&upload_id)
            .send()
            .await
            .expect("abort");

        let err = client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key("aborted.bin")
            .upload_id(&upload_id)
            .multipart_upload(manifest(vec![part]))
            .send()
            .await
            .expect_err("completion after abort");
        assert_eq!(err.code(), Some("NoSuchUpload"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_small_non_final_part() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "small").await;
        let upload_id = start(&client, &bucket, "small.bin").await;

        let parts = vec![
            put_part(&client, &bucket, "small.bin", &upload_id, 1, vec![1; 1024]).await,
            put_part(&client, &bucket, "small.bin", &upload_id, 2, vec![2; 1024]).await,
        ];

        let err = client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key("small.bin")
            .upload_id(&upload_id)
            .multipart_upload(manifest(parts))
            .send()
            .await
            .expect_err("parts below the minimum size");
        assert_eq!(err.code(), Some("EntityTooSmall"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unknown_part_etag() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "badtag").await;
        let upload_id = start(&client, &bucket, "badtag.bin").await;
        put_part(&client, &bucket, "badtag.bin", &upload_id, 1, vec![1; 1024]).await;

        let wrong = CompletedPart::builder()
            .part_number(1)
            .e_tag("\"00000000000000000000000000000000\"")
            .build();
        let err = client
            .complete_multipart_upload()
            .bucket(&bucket)
            .key("badtag.bin")
            .upload_id(&upload_id)
            .multipart_upload(manifest(vec![wrong]))
            .send()
            .await
            .expect_err("mismatched etag");
        assert_eq!(err.code(), Some("InvalidPart"));
    }
}
