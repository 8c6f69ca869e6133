//! RemoteObject: client-side handle on one object in one container.
//!
//! The handle keeps the attributes last observed from the service and
//! mediates every read, write and metadata update through the shared
//! [`Transport`]. Each operation is a single exchange against the object's
//! storage path; the status code decides between updating local state and
//! returning a typed [`ObjectError`].

use super::content_type::{ContentTypeResolver, ExtensionTypes};
use crate::{
    errors::{ObjectError, ObjectResult},
    models::{
        container::Container,
        metadata::{decode_metadata, metadata_headers},
        object::ObjectAttributes,
    },
    transport::{
        HttpResponse, Payload, StorageRequest, StreamingResponse, Transport, URL_UNSAFE,
        encode_segment, object_path,
    },
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use percent_encoding::utf8_percent_encode;
use std::{
    collections::BTreeMap,
    fmt,
    path::Path,
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// Content type of the marker objects created for parent paths.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/directory";

/// Header naming the source of a server-side copy.
pub const COPY_FROM_HEADER: HeaderName = HeaderName::from_static("x-copy-from");

/// Handle on a single remote object.
///
/// Attributes are only available after a successful [`populate`](Self::populate);
/// a handle opened on a missing object starts empty and is filled by a write.
/// The handle does no locking of its own: operations that change the cached
/// state take `&mut self`.
pub struct RemoteObject {
    container: Arc<dyn Container>,
    transport: Arc<dyn Transport>,
    content_types: Arc<dyn ContentTypeResolver>,

    container_name: String,
    name: String,

    /// Snapshot of the transport host at construction.
    storage_host: String,
    /// `<account prefix>/<container>/<object>`, fixed at construction.
    storage_path: String,

    make_path: bool,
    attributes: Option<ObjectAttributes>,
}

impl RemoteObject {
    /// Build a handle without contacting the service.
    pub fn new(
        container: Arc<dyn Container>,
        transport: Arc<dyn Transport>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let container_name = container.name().to_string();
        let storage_host = transport.storage_host().to_string();
        let storage_path = object_path(transport.storage_path(), &container_name, &name);

        Self {
            container,
            transport,
            content_types: Arc::new(ExtensionTypes),
            container_name,
            name,
            storage_host,
            storage_path,
            make_path: false,
            attributes: None,
        }
    }

    /// Build a handle and populate it if the container reports the object.
    pub async fn open(
        container: Arc<dyn Container>,
        transport: Arc<dyn Transport>,
        name: impl Into<String>,
    ) -> ObjectResult<Self> {
        let mut object = Self::new(container, transport, name);
        if object.container.object_exists(&object.name).await {
            object.populate().await?;
        } else {
            debug!("object `{}` not present, handle left empty", object.name);
        }
        Ok(object)
    }

    /// Use `resolver` to pick a content type for writes without one.
    pub fn with_content_types(mut self, resolver: Arc<dyn ContentTypeResolver>) -> Self {
        self.content_types = resolver;
        self
    }

    /// Create directory marker objects for missing parent paths after writes.
    pub fn with_make_path(mut self, make_path: bool) -> Self {
        self.make_path = make_path;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn storage_host(&self) -> &str {
        &self.storage_host
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    /// Attributes from the last population, `None` before the first one.
    pub fn attributes(&self) -> Option<&ObjectAttributes> {
        self.attributes.as_ref()
    }

    pub fn is_populated(&self) -> bool {
        self.attributes.is_some()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.attributes.as_ref().map(|a| a.size_bytes)
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.attributes.as_ref().and_then(|a| a.last_modified)
    }

    pub fn etag(&self) -> Option<&str> {
        self.attributes.as_ref().and_then(|a| a.etag.as_deref())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.attributes.as_ref().and_then(|a| a.content_type.as_deref())
    }

    /// Metadata headers exactly as received.
    pub fn raw_metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.attributes.as_ref().map(|a| &a.raw_metadata)
    }

    fn request(&self, method: Method) -> StorageRequest {
        StorageRequest::new(method, self.storage_host.clone(), self.storage_path.clone())
    }

    /// Fetch the object's attributes with a HEAD request.
    ///
    /// Any answer other than 204 means the object is gone; the cached
    /// attributes are then left as they were.
    pub async fn populate(&mut self) -> ObjectResult<()> {
        let response = self.transport.request(self.request(Method::HEAD)).await?;
        if response.status() != StatusCode::NO_CONTENT {
            debug!("HEAD {} answered {}", self.storage_path, response.status());
            return Err(ObjectError::ObjectNotFound(self.name.clone()));
        }

        let attributes = ObjectAttributes::from_headers(response.headers());
        debug!(
            "populated `{}`: {} bytes, etag {:?}",
            self.name, attributes.size_bytes, attributes.etag
        );
        self.attributes = Some(attributes);
        Ok(())
    }

    /// Alias of [`populate`](Self::populate).
    pub async fn refresh(&mut self) -> ObjectResult<()> {
        self.populate().await
    }

    /// Read the whole object.
    ///
    /// One trailing line terminator (`\r\n`, `\n` or `\r`) is dropped from
    /// the body.
    pub async fn read_all(&self, headers: HeaderMap) -> ObjectResult<Bytes> {
        let response = self
            .transport
            .request(self.request(Method::GET).headers(headers))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(ObjectError::ObjectNotFound(self.name.clone()));
        }
        Ok(strip_line_terminator(response.body))
    }

    /// Start a GET and return the response once its status is confirmed.
    ///
    /// Nothing of the body has been read when this returns.
    pub async fn open_stream(&self, headers: HeaderMap) -> ObjectResult<StreamingResponse> {
        let response = self
            .transport
            .request_stream(self.request(Method::GET).headers(headers))
            .await?;
        if response.status() != StatusCode::OK {
            return Err(ObjectError::ObjectNotFound(self.name.clone()));
        }
        Ok(response)
    }

    /// Stream the object through `sink`, one call per received chunk.
    ///
    /// The next chunk is only pulled after `sink` returns, so a slow sink
    /// slows the transfer down. `sink` is never called when the object is
    /// missing. Returns the number of bytes delivered.
    pub async fn read_stream<F>(&self, headers: HeaderMap, sink: F) -> ObjectResult<u64>
    where
        F: FnMut(Bytes),
    {
        let response = self.open_stream(headers).await?;
        Ok(response.read_body(sink).await?)
    }

    /// Stream the object into a local file, replacing it. Returns the number
    /// of bytes written.
    pub async fn save_to_path(&self, path: impl AsRef<Path>) -> ObjectResult<u64> {
        let target = path.as_ref();
        let mut response = self.open_stream(HeaderMap::new()).await?;
        let mut file = File::create(target).await?;
        let mut written = 0u64;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    discard_partial(target).await;
                    return Err(err.into());
                }
            };
            if let Err(err) = file.write_all(&chunk).await {
                discard_partial(target).await;
                return Err(err.into());
            }
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!(
            "saved `{}` to {} ({} bytes)",
            self.name,
            target.display(),
            written
        );
        Ok(written)
    }

    /// Upload `data` as the object's content.
    ///
    /// Without a `Content-Type` header one is inferred from the object name,
    /// falling back to `application/octet-stream`. An `ETag` header is checked
    /// by the service against the received bytes. With path creation enabled
    /// the parent markers are created first, so a marker failure leaves the
    /// object unwritten. On success the attributes are refreshed from the
    /// service; on failure they are left untouched.
    pub async fn write(
        &mut self,
        data: Option<Payload>,
        mut headers: HeaderMap,
    ) -> ObjectResult<()> {
        let Some(data) = data else {
            return Err(ObjectError::MissingData(self.name.clone()));
        };
        if self.make_path {
            self.make_parent_paths().await?;
        }

        if !headers.contains_key(header::CONTENT_TYPE) {
            let content_type = self
                .content_types
                .infer_type(&self.name)
                .unwrap_or(mime::APPLICATION_OCTET_STREAM);
            let value = HeaderValue::from_str(content_type.as_ref())
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
            headers.insert(header::CONTENT_TYPE, value);
        }

        let response = self
            .transport
            .request(self.request(Method::PUT).headers(headers).body(data))
            .await?;
        match response.status() {
            StatusCode::CREATED => {}
            StatusCode::PRECONDITION_FAILED => return Err(ObjectError::InvalidContentLength),
            StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(ObjectError::ChecksumMismatch(self.name.clone()));
            }
            status => {
                warn!("PUT {} answered {}", self.storage_path, status);
                return Err(ObjectError::InvalidResponse { status });
            }
        }

        self.populate().await?;
        info!("wrote `{}` to container `{}`", self.name, self.container_name);
        Ok(())
    }

    /// Upload the content of a local file, streamed as it is read.
    ///
    /// Opening the file surfaces the filesystem error unchanged.
    pub async fn load_from_path(&mut self, path: impl AsRef<Path>) -> ObjectResult<()> {
        let file = File::open(path.as_ref()).await?;
        let length = file.metadata().await?.len();

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        let payload = Payload::from_stream(ReaderStream::new(file));
        self.write(Some(payload), headers).await
    }

    /// Create a directory marker for every missing parent of the object name,
    /// deepest first.
    async fn make_parent_paths(&self) -> ObjectResult<()> {
        for parent in parent_paths(&self.name) {
            if self.container.object_exists(&parent).await {
                continue;
            }
            let path = object_path(self.transport.storage_path(), &self.container_name, &parent);
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(DIRECTORY_CONTENT_TYPE),
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
            let request = StorageRequest::new(Method::PUT, self.storage_host.clone(), path)
                .headers(headers);
            let response = self.transport.request(request).await?;
            if response.status() != StatusCode::CREATED {
                warn!(
                    "directory marker `{}` answered {}",
                    parent,
                    response.status()
                );
                return Err(ObjectError::InvalidResponse {
                    status: response.status(),
                });
            }
            debug!("created directory marker `{}`", parent);
        }
        Ok(())
    }

    /// User metadata with the header prefix removed and values decoded.
    ///
    /// Empty before the first population.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.attributes
            .as_ref()
            .map(|a| decode_metadata(&a.raw_metadata))
            .unwrap_or_default()
    }

    /// Replace the object's user metadata with `pairs`.
    ///
    /// Cached attributes are not refreshed; call [`populate`](Self::populate)
    /// to observe the new values.
    pub async fn set_metadata<I, K, V>(&self, pairs: I) -> ObjectResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let headers = metadata_headers(pairs)?;
        let count = headers.len();
        let response = self
            .transport
            .request(self.request(Method::POST).headers(headers))
            .await?;
        match response.status() {
            StatusCode::ACCEPTED => {
                info!("set {} metadata entries on `{}`", count, self.name);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ObjectError::ObjectNotFound(self.name.clone())),
            status => {
                warn!("POST {} answered {}", self.storage_path, status);
                Err(ObjectError::InvalidResponse { status })
            }
        }
    }

    /// Server-side copy of this object to `new_name` in `target`.
    ///
    /// The current content type travels with the copy; `headers` may add or
    /// override entries. Returns a handle on the new object.
    pub async fn copy_to(
        &self,
        target: Arc<dyn Container>,
        new_name: impl Into<String>,
        mut headers: HeaderMap,
    ) -> ObjectResult<RemoteObject> {
        let new_name = new_name.into();
        if target.name() == self.container_name && new_name == self.name {
            return Err(ObjectError::InvalidCopyTarget(self.name.clone()));
        }

        let source = format!(
            "{}/{}",
            encode_segment(&self.container_name),
            encode_segment(&self.name)
        );
        let source = HeaderValue::from_str(&source)
            .map_err(|_| ObjectError::InvalidCopyTarget(self.name.clone()))?;
        headers.insert(COPY_FROM_HEADER, source);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(0u64));
        if !headers.contains_key(header::CONTENT_TYPE) {
            if let Some(value) = self
                .content_type()
                .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
                .and_then(|ct| HeaderValue::from_str(ct).ok())
            {
                headers.insert(header::CONTENT_TYPE, value);
            }
        }

        let path = object_path(self.transport.storage_path(), target.name(), &new_name);
        let request =
            StorageRequest::new(Method::PUT, self.storage_host.clone(), path).headers(headers);
        let response = self.transport.request(request).await?;
        if !response.status().is_success() {
            warn!("copy of `{}` answered {}", self.name, response.status());
            return Err(ObjectError::InvalidResponse {
                status: response.status(),
            });
        }
        info!(
            "copied `{}/{}` to `{}/{}`",
            self.container_name,
            self.name,
            target.name(),
            new_name
        );

        RemoteObject::open(target, self.transport.clone(), new_name).await
    }

    /// CDN URL of the object when its container is public.
    pub fn public_url(&self) -> Option<String> {
        if !self.container.is_public() {
            return None;
        }
        let base = self.container.cdn_base_url()?;
        Some(format!(
            "{}/{}",
            base,
            utf8_percent_encode(&self.name, URL_UNSAFE)
        ))
    }
}

impl fmt::Display for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteObject")
            .field("container_name", &self.container_name)
            .field("name", &self.name)
            .field("storage_host", &self.storage_host)
            .field("storage_path", &self.storage_path)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// Drop one trailing `\r\n`, `\n` or `\r`.
fn strip_line_terminator(mut body: Bytes) -> Bytes {
    if body.ends_with(b"\r\n") {
        body.truncate(body.len() - 2);
    } else if body.ends_with(b"\n") || body.ends_with(b"\r") {
        body.truncate(body.len() - 1);
    }
    body
}

/// Parent paths of an object name, deepest first: `a/b/c.txt` gives `a/b`, `a`.
fn parent_paths(name: &str) -> Vec<String> {
    let mut parents = Vec::new();
    let mut current = name.trim_end_matches('/');
    while let Some((parent, _)) = current.rsplit_once('/') {
        let parent = parent.trim_end_matches('/');
        if parent.is_empty() {
            break;
        }
        parents.push(parent.to_string());
        current = parent;
    }
    parents
}

/// Remove a partially written download target.
async fn discard_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        debug!("could not remove partial file {}: {}", path.display(), err);
    }
}
