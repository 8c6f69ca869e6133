//! Error types for object and transport operations.

use http::StatusCode;
use std::io;
use thiserror::Error;

/// Failures raised by [`RemoteObject`](crate::services::remote_object::RemoteObject)
/// operations.
///
/// Expected service answers (missing object, rejected checksum, ...) get their
/// own variants so callers can branch on them. Transport and filesystem
/// failures pass through untouched.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("object `{0}` does not exist")]
    ObjectNotFound(String),
    #[error("invalid response code {status}")]
    InvalidResponse { status: StatusCode },
    #[error("invalid content-length header sent")]
    InvalidContentLength,
    #[error("mismatched checksum for object `{0}`")]
    ChecksumMismatch(String),
    #[error("no data was provided for object `{0}`")]
    MissingData(String),
    #[error("metadata entry `{key}` invalid: {reason}")]
    InvalidMetadata { key: String, reason: String },
    #[error("object `{0}` cannot be copied onto itself")]
    InvalidCopyTarget(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ObjectResult<T> = Result<T, ObjectError>;

/// Failures below the object protocol: building or performing the HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("storage url `{url}` invalid: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("header `{0}` has an invalid value")]
    InvalidHeader(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ObjectError {
    /// Status carried by an [`ObjectError::InvalidResponse`], if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ObjectError::InvalidResponse { status } => Some(*status),
            _ => None,
        }
    }
}
