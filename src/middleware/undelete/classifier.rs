//! Decides what the undelete layer does with an inbound request.

use crate::{config::UndeleteConfig, models::request_path::ObjectPath};
use axum::{
    body::Body,
    http::{HeaderValue, Method, Response, StatusCode, header},
};
use percent_encoding::percent_decode_str;

pub const BLOCKED_BODY: &str =
    "Attempted to delete from a trash container, but block_trash_deletes is enabled\n";

#[derive(Debug, PartialEq, Eq)]
pub enum Classification {
    /// Hand the request to the storage service as-is.
    Passthrough,
    /// Refuse with `405 Method Not Allowed` without contacting storage.
    Blocked,
    /// Copy the object to trash before deleting it.
    Intercept(ObjectPath),
}

pub fn classify(config: &UndeleteConfig, method: &Method, path: &str) -> Classification {
    if method != Method::DELETE {
        return Classification::Passthrough;
    }

    let Some(target) = ObjectPath::parse(path) else {
        return Classification::Passthrough;
    };

    // No trash-of-trash: checked before any copy is attempted.
    if is_trash_container(config, &target.container) {
        return if config.block_trash_deletes {
            Classification::Blocked
        } else {
            Classification::Passthrough
        };
    }

    Classification::Intercept(target)
}

/// Prefix test on the decoded container name.
pub fn is_trash_container(config: &UndeleteConfig, container: &str) -> bool {
    percent_decode_str(container)
        .decode_utf8_lossy()
        .starts_with(config.trash_prefix.as_str())
}

pub fn blocked_response() -> Response<Body> {
    let mut response = Response::new(Body::from(BLOCKED_BODY));
    *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
