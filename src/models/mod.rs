//! Core data models for the undelete layer.
//!
//! Nothing here is persisted; these are the values the layer reasons about
//! while handling a single request.

pub mod request_path;
pub mod upstream_response;
