//! src/services/proxy_service.rs
//!
//! ProxyService — forwards requests to the upstream storage proxy over HTTP
//! and streams responses back. It is the storage service the undelete layer
//! wraps in the binary; it knows nothing about trash.

use crate::errors::AppError;
use axum::{
    body::{Body, HttpBody},
    http::{HeaderMap, Request, Response, StatusCode, header},
    response::IntoResponse,
};
use futures::{StreamExt, future::BoxFuture};
use std::{
    convert::Infallible,
    io,
    sync::Arc,
    task::{Context, Poll},
};
use tower::Service;
use tracing::{debug, warn};

/// Connection-scoped headers that must not be relayed between hops, on top of
/// whatever the `Connection` header itself names.
const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Readiness endpoint of the storage proxy.
const HEALTHCHECK_PATH: &str = "/healthcheck";

#[derive(Clone)]
pub struct ProxyService {
    client: reqwest::Client,
    /// Upstream base URL without a trailing `/`.
    base_url: Arc<str>,
}

impl ProxyService {
    pub fn new(upstream_url: &str) -> anyhow::Result<Self> {
        let parsed = reqwest::Url::parse(upstream_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("upstream URL must be http or https: {}", upstream_url);
        }

        Ok(Self {
            // Redirects belong to the caller, not to this hop.
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()?,
            base_url: Arc::from(upstream_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward `req` upstream and stream the answer back.
    pub async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, AppError> {
        let (parts, body) = req.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!("proxying {} {}", parts.method, url);

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);

        let mut upstream = self.client.request(parts.method, &url).headers(headers);
        if body.size_hint().exact() != Some(0) {
            let stream = body
                .into_data_stream()
                .map(|chunk| chunk.map_err(io::Error::other));
            upstream = upstream.body(reqwest::Body::wrap_stream(stream));
        }

        let resp = upstream.send().await.inspect_err(|err| {
            warn!("upstream request to {} failed: {}", url, err);
        })?;

        let status = resp.status();
        let mut resp_headers = resp.headers().clone();
        strip_hop_by_hop(&mut resp_headers);

        let mut response = Response::new(Body::from_stream(resp.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = resp_headers;
        Ok(response)
    }

    /// `GET /healthcheck` on the upstream. `Ok` carries the upstream status.
    pub async fn healthcheck(&self) -> Result<StatusCode, AppError> {
        let url = format!("{}{}", self.base_url, HEALTHCHECK_PATH);
        let resp = self.client.get(&url).send().await?;
        Ok(resp.status())
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<header::HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| header::HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

impl Service<Request<Body>> for ProxyService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move {
            Ok(match service.forward(req).await {
                Ok(response) => response,
                Err(err) => err.into_response(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn rejects_non_http_upstreams() {
        assert!(ProxyService::new("ftp://storage.local").is_err());
        assert!(ProxyService::new("not a url").is_err());
    }

    #[test]
    fn trims_trailing_slash() {
        let proxy = ProxyService::new("http://127.0.0.1:8081/").unwrap();
        assert_eq!(proxy.base_url(), "http://127.0.0.1:8081");
    }

    #[test]
    fn strips_connection_headers_only() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("proxy.local"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("x-auth-token", HeaderValue::from_static("AUTH_tk"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-auth-token"], "AUTH_tk");
    }

    #[test]
    fn strips_headers_named_by_connection() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONNECTION,
            HeaderValue::from_static("close, X-Hop-Secret ,x-trace-hop"),
        );
        headers.insert("x-hop-secret", HeaderValue::from_static("s3cr3t"));
        headers.insert("x-trace-hop", HeaderValue::from_static("1"));
        headers.insert("x-object-meta-color", HeaderValue::from_static("blue"));

        strip_hop_by_hop(&mut headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-object-meta-color"], "blue");
    }

    #[tokio::test]
    async fn redirects_are_relayed_not_followed() {
        use axum::{Router, response::Redirect, routing::get};

        let upstream = Router::new()
            .route("/v1/a/c/dir", get(|| async { Redirect::permanent("/v1/a/c/dir/") }))
            .route("/v1/a/c/dir/", get(|| async { "listing" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, upstream).await.unwrap();
        });

        let mut proxy = ProxyService::new(&format!("http://{}", addr)).unwrap();
        let request = Request::builder()
            .method("GET")
            .uri("/v1/a/c/dir")
            .body(Body::empty())
            .unwrap();

        let response = proxy.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/v1/a/c/dir/");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        // Port 9 (discard) on localhost is not expected to accept connections.
        let mut proxy = ProxyService::new("http://127.0.0.1:9").unwrap();
        let request = Request::builder()
            .method("GET")
            .uri("/v1/a/c/o")
            .body(Body::empty())
            .unwrap();

        let response = proxy.call(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
