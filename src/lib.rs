//! Undelete proxy for Swift-style object storage.
//!
//! Object DELETEs passing through [`middleware::UndeleteLayer`] first copy the
//! object into a trash container of the same account, so an administrator can
//! copy it back later.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
