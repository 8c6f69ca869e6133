//! Object-level operations on top of the transport and container seams.

pub mod content_type;
pub mod remote_object;
