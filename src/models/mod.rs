//! Data types shared by object handles: cached attributes, the user metadata
//! codec and the container seam.

pub mod container;
pub mod metadata;
pub mod object;
