//! In-process storage service for integration tests.
//!
//! Routes (all under `/v1/{account}`):
//! - `PUT  /{container}/{*object}`: store object (201; 422 on ETag mismatch)
//! - `GET  /{container}/{*object}`: object body (200)
//! - `HEAD /{container}/{*object}`: attributes and metadata (204)
//! - `POST /{container}/{*object}`: replace user metadata (202)
//!
//! Missing objects answer 404 everywhere.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::put,
};
use chrono::{DateTime, Utc};
use objstore_client::{META_PREFIX, content_etag, models::object::format_http_date};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

const COPY_FROM: &str = "x-copy-from";

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
    pub metadata: Vec<(HeaderName, HeaderValue)>,
}

/// Shared object table keyed by `(container, object)`.
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
}

impl MockStorage {
    pub fn get(&self, container: &str, object: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), object.to_string()))
            .cloned()
    }

    fn insert(&self, container: String, object: String, stored: StoredObject) {
        self.objects
            .lock()
            .unwrap()
            .insert((container, object), stored);
    }
}

/// Start the service on an ephemeral port and return its account URL.
pub async fn spawn() -> (String, MockStorage) {
    let storage = MockStorage::default();
    let app = routes().with_state(storage.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/v1/AUTH_test", addr), storage)
}

fn routes() -> Router<MockStorage> {
    Router::new().route(
        "/v1/{account}/{container}/{*object}",
        put(put_object)
            .get(get_object)
            .head(head_object)
            .post(post_object),
    )
}

fn user_metadata(headers: &HeaderMap) -> Vec<(HeaderName, HeaderValue)> {
    headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with(META_PREFIX))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

async fn put_object(
    State(storage): State<MockStorage>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    if let Some(source) = headers.get(COPY_FROM).and_then(|v| v.to_str().ok()) {
        let Some((src_container, src_object)) = source.split_once('/') else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        let Some(mut copied) = storage.get(src_container, src_object) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        copied.content_type = content_type;
        copied.last_modified = Utc::now();
        storage.insert(container, object, copied);
        return StatusCode::CREATED.into_response();
    }

    let etag = content_etag(&body);
    if let Some(expected) = headers.get(header::ETAG).and_then(|v| v.to_str().ok()) {
        if expected.trim_matches('"') != etag {
            return StatusCode::UNPROCESSABLE_ENTITY.into_response();
        }
    }

    storage.insert(
        container,
        object,
        StoredObject {
            data: body,
            content_type,
            etag: etag.clone(),
            last_modified: Utc::now(),
            metadata: user_metadata(&headers),
        },
    );

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::CREATED;
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response.headers_mut().insert(header::ETAG, value);
    }
    response
}

async fn get_object(
    State(storage): State<MockStorage>,
    Path((_account, container, object)): Path<(String, String, String)>,
) -> Response {
    let Some(stored) = storage.get(&container, &object) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut response = Response::new(Body::from(stored.data.clone()));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &stored);
    response
}

async fn head_object(
    State(storage): State<MockStorage>,
    Path((_account, container, object)): Path<(String, String, String)>,
) -> Response {
    let Some(stored) = storage.get(&container, &object) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    set_object_headers(response.headers_mut(), &stored);
    response
}

async fn post_object(
    State(storage): State<MockStorage>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> StatusCode {
    let Some(mut stored) = storage.get(&container, &object) else {
        return StatusCode::NOT_FOUND;
    };
    stored.metadata = user_metadata(&headers);
    storage.insert(container, object, stored);
    StatusCode::ACCEPTED
}

fn set_object_headers(headers: &mut HeaderMap, stored: &StoredObject) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&stored.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(stored.data.len()));
    if let Ok(value) = HeaderValue::from_str(&stored.etag) {
        headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format_http_date(&stored.last_modified)) {
        headers.insert(header::LAST_MODIFIED, value);
    }
    for (name, value) in &stored.metadata {
        headers.append(name.clone(), value.clone());
    }
}
