//! Scripted collaborators for unit tests.

use super::{Payload, Response, StorageRequest, StreamingResponse, Transport};
use crate::{errors::TransportError, models::container::Container};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::{
    collections::{HashSet, VecDeque},
    sync::Mutex,
};

pub(crate) const HOST: &str = "storage.test";
pub(crate) const PREFIX: &str = "/v1/AUTH_test";

/// A request as seen by [`ScriptedTransport`], body collected.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub host: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Canned reply: status, headers and the body split into chunks.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    chunks: Vec<Bytes>,
}

impl Reply {
    pub fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            headers: HeaderMap::new(),
            chunks: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    pub fn body(mut self, body: &'static str) -> Self {
        self.chunks = vec![Bytes::from_static(body.as_bytes())];
        self
    }

    pub fn chunks(mut self, chunks: &[&'static str]) -> Self {
        self.chunks = chunks
            .iter()
            .map(|chunk| Bytes::from_static(chunk.as_bytes()))
            .collect();
        self
    }

    /// The HEAD answer for an existing object.
    pub fn head(size: u64, etag: &str, content_type: &str) -> Self {
        Reply::status(204)
            .header("content-length", &size.to_string())
            .header("last-modified", "Sun, 06 Nov 1994 08:49:37 GMT")
            .header("etag", etag)
            .header("content-type", content_type)
    }
}

/// Transport that answers from a queue and records every request.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    async fn record(&self, request: StorageRequest) -> Reply {
        let body = match request.body {
            Payload::Empty => Bytes::new(),
            Payload::Bytes(bytes) => bytes,
            Payload::Stream(stream) => {
                let parts: Vec<Bytes> = stream.map(|chunk| chunk.unwrap()).collect().await;
                Bytes::from(parts.concat())
            }
        };
        self.requests.lock().unwrap().push(Recorded {
            method: request.method,
            host: request.host,
            path: request.path,
            headers: request.headers,
            body,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn storage_host(&self) -> &str {
        HOST
    }

    fn storage_path(&self) -> &str {
        PREFIX
    }

    async fn request(&self, request: StorageRequest) -> Result<Response, TransportError> {
        let reply = self.record(request).await;
        Ok(Response {
            status: reply.status,
            headers: reply.headers,
            body: Bytes::from(reply.chunks.concat()),
        })
    }

    async fn request_stream(
        &self,
        request: StorageRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let reply = self.record(request).await;
        let body = stream::iter(reply.chunks.into_iter().map(Ok));
        Ok(StreamingResponse::new(reply.status, reply.headers, body))
    }
}

/// Container with fixed answers; object existence comes from a name set.
#[derive(Debug, Default)]
pub(crate) struct StaticContainer {
    pub name: String,
    pub existing: HashSet<String>,
    pub cdn: Option<String>,
}

impl StaticContainer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_object(mut self, object: &str) -> Self {
        self.existing.insert(object.to_string());
        self
    }

    pub fn public(mut self, cdn: &str) -> Self {
        self.cdn = Some(cdn.to_string());
        self
    }
}

#[async_trait]
impl Container for StaticContainer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn object_exists(&self, name: &str) -> bool {
        self.existing.contains(name)
    }

    fn is_public(&self) -> bool {
        self.cdn.is_some()
    }

    fn cdn_base_url(&self) -> Option<&str> {
        self.cdn.as_deref()
    }
}
