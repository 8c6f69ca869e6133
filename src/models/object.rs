//! Cached attributes of a remote object.

use super::metadata::META_PREFIX;
use chrono::{DateTime, Utc};
use http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Object attributes as last observed from a metadata (HEAD) response.
///
/// Only exists after a successful population; an object handle that has not
/// been populated carries no attributes at all.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectAttributes {
    /// Size in bytes, from `content-length`.
    pub size_bytes: u64,

    /// Timestamp when the object was last modified.
    pub last_modified: Option<DateTime<Utc>>,

    /// Opaque checksum the service keeps for the content.
    pub etag: Option<String>,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// User metadata headers as received, keyed by lower-cased header name
    /// (`x-object-meta-*`).
    pub raw_metadata: BTreeMap<String, String>,
}

impl ObjectAttributes {
    /// Extract attributes from response headers.
    ///
    /// Missing or unparsable standard headers leave the field empty (size 0)
    /// rather than failing the population. Repeated metadata headers are
    /// joined with `,`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let size_bytes = header_text(headers, header::CONTENT_LENGTH.as_str())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let last_modified =
            header_text(headers, header::LAST_MODIFIED.as_str()).and_then(|v| parse_http_date(&v));

        let mut raw_metadata = BTreeMap::new();
        for name in headers.keys() {
            let key = name.as_str();
            if !key.starts_with(META_PREFIX) {
                continue;
            }
            let joined = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",");
            raw_metadata.insert(key.to_string(), joined);
        }

        Self {
            size_bytes,
            last_modified,
            etag: header_text(headers, header::ETAG.as_str()),
            content_type: header_text(headers, header::CONTENT_TYPE.as_str()),
            raw_metadata,
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

/// Parse an HTTP date such as `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Format a timestamp the way the service sends `last-modified`.
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// MD5 hex digest of `data`, the checksum the service compares against an
/// `ETag` request header on upload.
pub fn content_etag(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}
