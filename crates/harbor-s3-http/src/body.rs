//! S3 response body types supporting buffered, streaming, and empty modes.
//!
//! - **Buffered**: XML payloads, error bodies, and object bytes.
//! - **Streaming**: chunks pushed from a blocking task through a bounded
//!   channel, used by `CompleteMultipartUpload` to keep the connection alive
//!   while parts are combined.
//! - **Empty**: 204 responses and other bodiless replies.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::Full;
use tokio::sync::mpsc;

/// S3 response body.
///
/// Implements [`http_body::Body`] so it can be used directly with hyper responses.
#[derive(Debug, Default)]
pub enum S3ResponseBody {
    /// Buffered body for small responses.
    Buffered(Full<Bytes>),
    /// Chunks produced elsewhere; the body ends when every sender is dropped.
    Streaming(mpsc::Receiver<Bytes>),
    /// Empty body for 204 responses.
    #[default]
    Empty,
}

impl S3ResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a buffered body from an XML byte vector.
    #[must_use]
    pub fn from_xml(xml: Vec<u8>) -> Self {
        Self::Buffered(Full::new(Bytes::from(xml)))
    }

    /// Create a streaming body together with the sender that feeds it.
    ///
    /// `capacity` bounds how many chunks may be buffered before the producer
    /// blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use harbor_s3_http::S3ResponseBody;
    /// use http_body_util::BodyExt;
    ///
    /// # tokio_test::block_on(async {
    /// let (tx, body) = S3ResponseBody::channel(2);
    /// tx.send(Bytes::from_static(b"<Done/>")).await.unwrap();
    /// drop(tx);
    ///
    /// let collected = body.collect().await.unwrap().to_bytes();
    /// assert_eq!(&collected[..], b"<Done/>");
    /// # });
    /// ```
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<Bytes>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::Streaming(rx))
    }
}

impl http_body::Body for S3ResponseBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(rx) => rx
                .poll_recv(cx)
                .map(|chunk| chunk.map(|data| Ok(http_body::Frame::data(data)))),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(_) => false,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(_) => http_body::SizeHint::default(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
