//! HTTP middleware.

pub mod logging;
pub mod undelete;

pub use logging::logging_middleware;
pub use undelete::{Undelete, UndeleteLayer};
