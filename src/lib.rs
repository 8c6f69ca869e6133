//! Client-side handles on objects stored in an HTTP object-storage service.
//!
//! A [`RemoteObject`] represents one named object inside one container. It
//! populates its attributes from HEAD responses, reads content buffered or
//! streamed, uploads content with optional checksum verification, and
//! encodes user metadata into `X-Object-Meta-*` headers.
//!
//! The service is reached through the [`Transport`] trait; [`ReqwestTransport`]
//! is the HTTP implementation. Containers are described by the [`Container`]
//! trait, with [`RemoteContainer`] as the transport-backed implementation.

pub mod errors;
pub mod models;
pub mod services;
pub mod transport;

pub use errors::{ObjectError, ObjectResult, TransportError};
pub use models::{
    container::{Container, RemoteContainer},
    metadata::{META_PREFIX, decode_metadata},
    object::{ObjectAttributes, content_etag},
};
pub use services::{
    content_type::{ContentTypeResolver, ExtensionTypes},
    remote_object::RemoteObject,
};
pub use transport::{
    HttpResponse, Payload, Response, StorageRequest, StreamingResponse, Transport,
    client::{ReqwestTransport, TransportConfig},
};
