//! Transport seam between object handles and the storage service.
//!
//! Object handles never talk HTTP directly. They build a [`StorageRequest`],
//! hand it to a [`Transport`] and interpret the typed [`Response`] or
//! [`StreamingResponse`] that comes back. [`client::ReqwestTransport`] is the
//! production implementation.

pub mod client;
#[cfg(test)]
pub(crate) mod testing;

use crate::errors::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream::BoxStream};
use http::{HeaderMap, Method, StatusCode};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::{fmt, io, pin::Pin};

/// Characters escaped when an object name is placed in a public URL.
///
/// Mirrors classic `URI.escape`: reserved characters such as `/`, `:` and `&`
/// stay literal, everything unsafe is percent-encoded.
pub const URL_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Characters escaped in container and object names inside a storage path.
/// `?` and `&` would otherwise end the path or split a query.
pub const PATH_UNSAFE: &AsciiSet = &URL_UNSAFE.add(b'?').add(b'&');

/// Owned byte stream used for request bodies.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Request body handed to the transport.
pub enum Payload {
    Empty,
    Bytes(Bytes),
    /// Streamed as it is read; the transport must not buffer it whole.
    Stream(ByteStream),
}

impl Payload {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + Sync + 'static,
    {
        Payload::Stream(Box::pin(stream))
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Payload::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Bytes(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

impl From<&'static [u8]> for Payload {
    fn from(value: &'static [u8]) -> Self {
        Payload::Bytes(Bytes::from_static(value))
    }
}

impl From<&'static str> for Payload {
    fn from(value: &'static str) -> Self {
        Payload::Bytes(Bytes::from_static(value.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

/// One request against the storage service.
#[derive(Debug)]
pub struct StorageRequest {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Payload,
}

impl StorageRequest {
    pub fn new(method: Method, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            host: host.into(),
            path: path.into(),
            headers: HeaderMap::new(),
            body: Payload::Empty,
        }
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn body(mut self, body: Payload) -> Self {
        self.body = body;
        self
    }
}

/// Status and header access shared by buffered and streaming responses.
pub trait HttpResponse {
    fn status(&self) -> StatusCode;

    fn headers(&self) -> &HeaderMap;
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse for Response {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Response whose body is pulled chunk by chunk.
///
/// The body is a finite, non-restartable sequence. A chunk is only requested
/// from the connection when the caller asks for it.
pub struct StreamingResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl StreamingResponse {
    pub fn new<S>(status: StatusCode, headers: HeaderMap, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: body.boxed(),
        }
    }

    /// Next body chunk, `None` once the body is exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.body.next().await.transpose()
    }

    /// Drain the body through `on_chunk`, one call per chunk.
    ///
    /// Returns the number of bytes delivered.
    pub async fn read_body<F>(mut self, mut on_chunk: F) -> Result<u64, TransportError>
    where
        F: FnMut(Bytes),
    {
        let mut delivered = 0u64;
        while let Some(chunk) = self.chunk().await? {
            delivered += chunk.len() as u64;
            on_chunk(chunk);
        }
        Ok(delivered)
    }
}

impl HttpResponse for StreamingResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs HTTP exchanges with the storage service.
///
/// One transport is shared by every container and object of a session; the
/// object layer only reads the host/path values and dispatches requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Host (with port, if any) requests are sent to.
    fn storage_host(&self) -> &str;

    /// Path prefix of the account, without a trailing slash.
    fn storage_path(&self) -> &str;

    /// Perform the exchange and buffer the whole response body.
    async fn request(&self, request: StorageRequest) -> Result<Response, TransportError>;

    /// Perform the exchange and hand back the body unread.
    async fn request_stream(
        &self,
        request: StorageRequest,
    ) -> Result<StreamingResponse, TransportError>;
}

/// Percent-encode one path segment (container or object name).
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_UNSAFE).to_string()
}

/// Build `<prefix>/<container>/<object>` with both names encoded.
pub fn object_path(prefix: &str, container: &str, object: &str) -> String {
    format!(
        "{}/{}/{}",
        prefix.trim_end_matches('/'),
        encode_segment(container),
        encode_segment(object)
    )
}
