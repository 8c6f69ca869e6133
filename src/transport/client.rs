//! reqwest-backed [`Transport`].

use super::{HttpResponse, Payload, Response, StorageRequest, StreamingResponse, Transport};
use crate::errors::TransportError;
use async_trait::async_trait;
use futures::TryStreamExt;
use http::{HeaderName, HeaderValue};
use reqwest::{Body, Client, Url};
use std::time::Duration;
use tracing::debug;

/// Header carrying the session token on every request.
pub const AUTH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-auth-token");

/// Settings for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Account storage URL, e.g. `https://storage.example.com/v1/AUTH_abc`.
    pub storage_url: String,
    /// Token sent as `X-Auth-Token`.
    pub auth_token: Option<String>,
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` lets long transfers run.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl TransportConfig {
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            storage_url: storage_url.into(),
            auth_token: None,
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

/// HTTP transport built on a shared [`reqwest::Client`].
///
/// The storage URL is split once into scheme, host and path prefix; requests
/// are then sent to `<scheme>://<host><path>` as built by the caller.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    scheme: String,
    storage_host: String,
    storage_path: String,
    auth_token: Option<HeaderValue>,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let url = Url::parse(&config.storage_url).map_err(|err| TransportError::InvalidUrl {
            url: config.storage_url.clone(),
            reason: err.to_string(),
        })?;
        let host = url.host_str().ok_or_else(|| TransportError::InvalidUrl {
            url: config.storage_url.clone(),
            reason: "missing host".into(),
        })?;
        let storage_host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let storage_path = url.path().trim_end_matches('/').to_string();

        let auth_token = config
            .auth_token
            .as_deref()
            .map(|token| {
                HeaderValue::from_str(token)
                    .map_err(|_| TransportError::InvalidHeader(AUTH_TOKEN_HEADER.to_string()))
            })
            .transpose()?;

        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        debug!(
            "transport ready for {}://{}{}",
            url.scheme(),
            storage_host,
            storage_path
        );

        Ok(Self {
            http,
            scheme: url.scheme().to_string(),
            storage_host,
            storage_path,
            auth_token,
        })
    }

    fn prepare(&self, request: StorageRequest) -> reqwest::RequestBuilder {
        let url = format!("{}://{}{}", self.scheme, request.host, request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self.http.request(request.method, url).headers(request.headers);
        if let Some(token) = &self.auth_token {
            builder = builder.header(AUTH_TOKEN_HEADER, token.clone());
        }
        match request.body {
            Payload::Empty => builder,
            Payload::Bytes(bytes) => builder.body(bytes),
            Payload::Stream(stream) => builder.body(Body::wrap_stream(stream)),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn storage_host(&self) -> &str {
        &self.storage_host
    }

    fn storage_path(&self) -> &str {
        &self.storage_path
    }

    async fn request(&self, request: StorageRequest) -> Result<Response, TransportError> {
        let response = self.prepare(request).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        let response = Response {
            status,
            headers,
            body,
        };
        debug!("answered {} with {} bytes", response.status(), response.body.len());
        Ok(response)
    }

    async fn request_stream(
        &self,
        request: StorageRequest,
    ) -> Result<StreamingResponse, TransportError> {
        let response = self.prepare(request).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map_err(TransportError::from);
        Ok(StreamingResponse::new(status, headers, body))
    }
}
