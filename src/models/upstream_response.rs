//! A fully drained response from one internal call to the storage service.

use axum::{
    body::Body,
    http::{HeaderMap, Response, StatusCode},
};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::warn;

/// Upper bound on the body kept from internal COPY/PUT responses. These are
/// empty or a short error message; anything past the bound is drained and
/// dropped.
pub const MAX_CONTROL_BODY: usize = 64 * 1024;

/// Status, headers and body of one internal request/response cycle.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Drain `response` completely and capture it.
    ///
    /// Status and headers are always the storage service's. The body is cut
    /// at [`MAX_CONTROL_BODY`]. Only a body that breaks off mid-transfer is
    /// reported as `502 Bad Gateway`, which callers treat as a failed step.
    pub async fn capture(response: Response<Body>) -> Self {
        let (parts, body) = response.into_parts();
        let mut stream = body.into_data_stream();
        let mut kept = BytesMut::new();
        let mut truncated = false;

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    let room = MAX_CONTROL_BODY - kept.len();
                    if bytes.len() > room {
                        truncated = true;
                    }
                    kept.extend_from_slice(&bytes[..bytes.len().min(room)]);
                }
                Err(err) => {
                    warn!(
                        "failed to drain storage response (status {}): {}",
                        parts.status, err
                    );
                    return Self::local(
                        StatusCode::BAD_GATEWAY,
                        format!("failed to read storage response: {}", err),
                    );
                }
            }
        }

        if truncated {
            warn!(
                "storage response body (status {}) cut at {} bytes",
                parts.status, MAX_CONTROL_BODY
            );
        }

        Self {
            status: parts.status,
            headers: parts.headers,
            body: kept.freeze(),
        }
    }

    /// A response synthesized by this layer rather than received upstream.
    pub fn local(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
