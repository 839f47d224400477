//! In-process storage fakes for driving the undelete layer.
//!
//! Both fakes implement `tower::Service` directly, so tests run with
//! `tower::ServiceExt::oneshot` and no network I/O.

#![allow(dead_code)]

use axum::{
    body::{self, Body},
    http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode},
};
use std::{
    collections::BTreeMap,
    convert::Infallible,
    future::{Ready, ready},
    sync::{Arc, Mutex},
    task::{Context, Poll},
};
use swift_undelete::{config::UndeleteConfig, middleware::UndeleteLayer};
use tower::{Layer, Service, ServiceExt};

/// One canned storage response.
#[derive(Debug, Clone)]
pub struct Scripted {
    status: StatusCode,
    headers: Vec<(&'static str, &'static str)>,
    body: &'static str,
}

pub fn respond(status: u16) -> Scripted {
    Scripted {
        status: StatusCode::from_u16(status).unwrap(),
        headers: Vec::new(),
        body: "",
    }
}

impl Scripted {
    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn body(mut self, body: &'static str) -> Self {
        self.body = body;
        self
    }

    fn to_response(&self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        for (name, value) in &self.headers {
            response
                .headers_mut()
                .append(*name, HeaderValue::from_static(*value));
        }
        response
    }
}

/// A request as the storage service received it.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

/// Answers with scripted responses in order; the last one repeats.
#[derive(Clone, Default)]
pub struct FakeStorage {
    responses: Arc<Mutex<Vec<Scripted>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeStorage {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::default(),
        }
    }

    /// `(method, path)` of every request received.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.method.to_string(), c.path.clone()))
            .collect()
    }

    pub fn calls_with_headers(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl Service<Request<Body>> for FakeStorage {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Ready<Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.calls.lock().unwrap().push(Call {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            query: req.uri().query().map(str::to_string),
            headers: req.headers().clone(),
        });

        let scripted = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            }
        };
        ready(Ok(scripted.to_response()))
    }
}

/// Container state of one account in [`ContainerStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub versions_location: Option<String>,
    pub objects: Vec<String>,
}

/// Storage with create-if-absent containers: PUT answers 201 for a new
/// container and 202 for an existing one, COPY answers 404 when the
/// destination container is missing.
#[derive(Clone, Default)]
pub struct ContainerStore {
    containers: Arc<Mutex<BTreeMap<String, Container>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl ContainerStore {
    pub fn with_containers(names: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut containers = store.containers.lock().unwrap();
            for name in names {
                containers.insert(name.to_string(), Container::default());
            }
        }
        store
    }

    pub fn snapshot(&self) -> BTreeMap<String, Container> {
        self.containers.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn handle(&self, req: &Request<Body>) -> StatusCode {
        // Paths look like /v1/<account>/<container>[/<object>].
        let mut segments = req.uri().path().splitn(5, '/').skip(3);
        let container = segments.next().unwrap_or_default().to_string();
        let object = segments.next().map(str::to_string);
        let mut containers = self.containers.lock().unwrap();

        match (req.method().as_str(), object) {
            ("PUT", None) => {
                let versions_location = req
                    .headers()
                    .get("x-versions-location")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                match containers.get_mut(&container) {
                    Some(existing) => {
                        existing.versions_location = versions_location;
                        StatusCode::ACCEPTED
                    }
                    None => {
                        containers.insert(
                            container,
                            Container {
                                versions_location,
                                objects: Vec::new(),
                            },
                        );
                        StatusCode::CREATED
                    }
                }
            }
            ("COPY", Some(_)) => {
                if !containers.contains_key(&container) {
                    return StatusCode::NOT_FOUND;
                }
                let destination = req
                    .headers()
                    .get("destination")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let Some((dest_container, dest_object)) = destination.split_once('/') else {
                    return StatusCode::PRECONDITION_FAILED;
                };
                match containers.get_mut(dest_container) {
                    Some(dest) => {
                        dest.objects.push(dest_object.to_string());
                        StatusCode::CREATED
                    }
                    None => StatusCode::NOT_FOUND,
                }
            }
            ("DELETE", Some(_)) => StatusCode::NO_CONTENT,
            _ => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl Service<Request<Body>> for ContainerStore {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Ready<Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        self.calls
            .lock()
            .unwrap()
            .push((req.method().to_string(), req.uri().path().to_string()));
        let status = self.handle(&req);

        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        ready(Ok(response))
    }
}

pub fn delete(uri: &str) -> Request<Body> {
    request("DELETE", uri)
}

pub fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Run `req` through the undelete layer over `storage`.
pub async fn call_mware<S>(
    storage: S,
    config: UndeleteConfig,
    req: Request<Body>,
) -> (StatusCode, HeaderMap, String)
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    let response = UndeleteLayer::new(config)
        .layer(storage)
        .oneshot(req)
        .await
        .unwrap();

    let (parts, body) = response.into_parts();
    let bytes = body::to_bytes(body, usize::MAX).await.unwrap();
    (
        parts.status,
        parts.headers,
        String::from_utf8(bytes.to_vec()).unwrap(),
    )
}
