use crate::models::upstream_response::UpstreamResponse;
use axum::{
    Json,
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Prefix placed in front of the storage service's body when a trash copy
/// cannot be made.
pub const TRASH_COPY_ERROR_PREFIX: &str = "Error copying object to trash:\n";

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 502 Bad Gateway
    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::bad_gateway(format!("storage service unreachable: {}", err))
    }
}

/// A storage-service failure that stops an object from reaching the trash.
///
/// The status and headers are the storage service's own; the body is the
/// storage service's body behind [`TRASH_COPY_ERROR_PREFIX`].
#[derive(Debug, Clone, Error)]
#[error("storage service answered {status} while saving to trash")]
pub struct UpstreamFailure {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl From<UpstreamResponse> for UpstreamFailure {
    fn from(resp: UpstreamResponse) -> Self {
        let mut body = BytesMut::with_capacity(TRASH_COPY_ERROR_PREFIX.len() + resp.body.len());
        body.put_slice(TRASH_COPY_ERROR_PREFIX.as_bytes());
        body.put_slice(&resp.body);

        Self {
            status: resp.status,
            headers: resp.headers,
            body: body.freeze(),
        }
    }
}

impl IntoResponse for UpstreamFailure {
    fn into_response(self) -> Response {
        let mut headers = self.headers;
        // Framing belongs to the replaced body.
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

/// Why a trash step did not complete.
#[derive(Debug, Error)]
pub enum TrashError<E> {
    /// The storage service answered, but not with success.
    #[error(transparent)]
    Upstream(#[from] UpstreamFailure),
    /// The inner service itself failed to produce a response.
    #[error("storage service call failed")]
    Service(E),
}
