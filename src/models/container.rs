//! Containers: named collections of objects.

use crate::{
    errors::ObjectResult,
    services::remote_object::RemoteObject,
    transport::{HttpResponse, StorageRequest, Transport, object_path},
};
use async_trait::async_trait;
use http::Method;
use std::{fmt, sync::Arc};
use tracing::warn;

/// What an object handle needs from the container that owns it.
#[async_trait]
pub trait Container: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `name` currently exists in this container.
    async fn object_exists(&self, name: &str) -> bool;

    /// Whether the container is published through the CDN.
    fn is_public(&self) -> bool;

    /// CDN base URL; only meaningful when [`is_public`](Self::is_public).
    fn cdn_base_url(&self) -> Option<&str>;
}

/// Container addressed through a [`Transport`].
///
/// A container with a CDN base URL is considered public.
pub struct RemoteContainer {
    name: String,
    transport: Arc<dyn Transport>,
    cdn_url: Option<String>,
}

impl RemoteContainer {
    pub fn new(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
            cdn_url: None,
        }
    }

    pub fn with_cdn(mut self, cdn_url: Option<String>) -> Self {
        self.cdn_url = cdn_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    /// Open a handle on `name`, populated if the object exists.
    pub async fn object(self: &Arc<Self>, name: impl Into<String>) -> ObjectResult<RemoteObject> {
        let container: Arc<dyn Container> = self.clone();
        RemoteObject::open(container, self.transport.clone(), name).await
    }
}

#[async_trait]
impl Container for RemoteContainer {
    fn name(&self) -> &str {
        &self.name
    }

    /// HEAD on the object path; any 2xx answer means it exists. Transport
    /// failures are logged and reported as absence.
    async fn object_exists(&self, name: &str) -> bool {
        let path = object_path(self.transport.storage_path(), &self.name, name);
        let request = StorageRequest::new(Method::HEAD, self.transport.storage_host(), path);
        match self.transport.request(request).await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                warn!("existence check for `{}` failed: {}", name, err);
                false
            }
        }
    }

    fn is_public(&self) -> bool {
        self.cdn_url.is_some()
    }

    fn cdn_base_url(&self) -> Option<&str> {
        self.cdn_url.as_deref()
    }
}

impl fmt::Debug for RemoteContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteContainer")
            .field("name", &self.name)
            .field("cdn_url", &self.cdn_url)
            .finish_non_exhaustive()
    }
}
