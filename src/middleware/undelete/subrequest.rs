//! Internal requests issued to the storage service on the caller's behalf.

use crate::models::upstream_response::UpstreamResponse;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, Request, Response, StatusCode, header},
};
use tower::{Service, ServiceExt};
use tracing::{debug, warn};

/// Caller headers carried onto internal requests so they are authorized as
/// the caller.
const CREDENTIAL_HEADERS: [&str; 3] = ["x-auth-token", "x-storage-token", "authorization"];

/// Copy the caller's credentials out of `headers`.
pub fn credentials(headers: &HeaderMap) -> HeaderMap {
    let mut creds = HeaderMap::new();
    for name in CREDENTIAL_HEADERS {
        for value in headers.get_all(name) {
            creds.append(HeaderName::from_static(name), value.clone());
        }
    }
    creds
}

/// One internal request with an empty body.
#[derive(Debug)]
pub struct Subrequest {
    method: &'static str,
    path: String,
    headers: Vec<(HeaderName, String)>,
}

impl Subrequest {
    pub fn new(method: &'static str, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn into_request(self, credentials: &HeaderMap) -> Result<Request<Body>, axum::http::Error> {
        let mut builder = Request::builder().method(self.method).uri(self.path);
        for (name, value) in credentials {
            builder = builder.header(name, value);
        }
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        builder
            .header(header::CONTENT_LENGTH, "0")
            .body(Body::empty())
    }

    /// Send through `svc` and drain the response.
    ///
    /// A request that cannot be built is answered locally with
    /// `500 Internal Server Error` and never reaches the storage service.
    pub async fn send<S>(self, svc: &mut S, credentials: &HeaderMap) -> Result<UpstreamResponse, S::Error>
    where
        S: Service<Request<Body>, Response = Response<Body>>,
    {
        let method = self.method;
        let path = self.path.clone();

        let request = match self.into_request(credentials) {
            Ok(request) => request,
            Err(err) => {
                warn!("could not build {} {}: {}", method, path, err);
                return Ok(UpstreamResponse::local(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("invalid internal request {} {}", method, path),
                ));
            }
        };

        let response = svc.ready().await?.call(request).await?;
        let captured = UpstreamResponse::capture(response).await;
        debug!("{} {} -> {}", method, path, captured.status);
        Ok(captured)
    }
}

/// Send `request` through `svc` untouched.
pub async fn forward<S>(svc: &mut S, request: Request<Body>) -> Result<Response<Body>, S::Error>
where
    S: Service<Request<Body>, Response = Response<Body>>,
{
    svc.ready().await?.call(request).await
}
