//! User metadata carried in `X-Object-Meta-*` headers.
//!
//! Received headers are kept verbatim in
//! [`ObjectAttributes::raw_metadata`](super::object::ObjectAttributes). The
//! functions here turn that raw form into the caller-facing view and build the
//! request headers for a metadata update.

use crate::errors::{ObjectError, ObjectResult};
use http::{HeaderMap, HeaderName, HeaderValue};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;

/// Lower-cased prefix of every user metadata header.
pub const META_PREFIX: &str = "x-object-meta-";

/// Prefix used when sending metadata.
pub const META_HEADER_PREFIX: &str = "X-Object-Meta-";

/// Legacy encoding writes spaces as the two bytes `+-`.
const LEGACY_SPACE: &str = "+-";

/// Decode raw metadata headers into `key -> value`.
///
/// The prefix is stripped from the key, the value is percent-decoded, and
/// `+-` becomes a single space in both.
pub fn decode_metadata(raw: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    raw.iter()
        .map(|(name, value)| {
            let key = name
                .strip_prefix(META_PREFIX)
                .unwrap_or(name)
                .replace(LEGACY_SPACE, " ");
            let value = percent_decode_str(value)
                .decode_utf8_lossy()
                .replace(LEGACY_SPACE, " ");
            (key, value)
        })
        .collect()
}

/// `X-Object-Meta-<Key>` with only the first character of `key` upper-cased.
pub fn metadata_header_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}{}",
            META_HEADER_PREFIX,
            first.to_uppercase(),
            chars.as_str()
        ),
        None => META_HEADER_PREFIX.to_string(),
    }
}

/// Build the header set for a metadata update.
///
/// Values are sent as their plain string form. Keys that cannot form a header
/// name, or values with bytes a header cannot carry, are rejected before any
/// request is made.
pub fn metadata_headers<I, K, V>(pairs: I) -> ObjectResult<HeaderMap>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: ToString,
{
    let mut headers = HeaderMap::new();
    for (key, value) in pairs {
        let key = key.as_ref();
        let name = HeaderName::from_bytes(metadata_header_name(key).as_bytes()).map_err(|_| {
            ObjectError::InvalidMetadata {
                key: key.to_string(),
                reason: "not a valid header name".into(),
            }
        })?;
        let value = HeaderValue::from_bytes(value.to_string().as_bytes()).map_err(|_| {
            ObjectError::InvalidMetadata {
                key: key.to_string(),
                reason: "value contains control characters".into(),
            }
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}
