//! Copy-then-delete for one intercepted object DELETE.
//!
//! ```text
//! FirstCopy   2xx   -> ForwardDelete
//!             404   -> Provision
//!             other -> Fail
//! Provision   ok    -> RetryCopy
//!             err   -> Fail
//! RetryCopy   any   -> ForwardDelete
//! ```
//!
//! The retry's outcome is logged but never inspected: after successful
//! provisioning a second 404 means the source object itself is gone, and the
//! real DELETE reports that to the caller.

use super::{
    provisioner::{TrashProvisioner, trash_container_name},
    subrequest::{self, Subrequest},
};
use crate::{
    config::UndeleteConfig,
    errors::{TrashError, UpstreamFailure},
    models::{request_path::ObjectPath, upstream_response::UpstreamResponse},
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, Request, Response, StatusCode},
    response::IntoResponse,
};
use tower::Service;
use tracing::{debug, info, warn};

const DESTINATION: HeaderName = HeaderName::from_static("destination");
const DELETE_AFTER: HeaderName = HeaderName::from_static("x-delete-after");

#[derive(Debug)]
enum Step {
    FirstCopy,
    Provision,
    RetryCopy,
    ForwardDelete,
    Fail(UpstreamFailure),
}

pub struct Orchestrator<'a> {
    config: &'a UndeleteConfig,
    target: ObjectPath,
    trash_container: String,
    credentials: HeaderMap,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a UndeleteConfig, target: ObjectPath, inbound: &HeaderMap) -> Self {
        let trash_container = trash_container_name(&config.trash_prefix, &target.container);
        Self {
            config,
            target,
            trash_container,
            credentials: subrequest::credentials(inbound),
        }
    }

    /// Save the object to trash, then forward `delete` unmodified.
    ///
    /// `delete` is only sent once the copy has succeeded or has been retried
    /// after provisioning; on failure the caller gets the storage service's
    /// status and headers with a wrapped body instead.
    pub async fn run<S>(self, svc: &mut S, delete: Request<Body>) -> Result<Response<Body>, S::Error>
    where
        S: Service<Request<Body>, Response = Response<Body>>,
    {
        info!(
            "saving {} to trash container {}",
            self.target.object_path(),
            self.trash_container
        );

        let mut step = Step::FirstCopy;
        loop {
            debug!("{:?}", step);
            step = match step {
                Step::FirstCopy => {
                    let copied = self.copy_to_trash(svc).await?;
                    let status = copied.status;
                    match status {
                        s if s.is_success() => Step::ForwardDelete,
                        StatusCode::NOT_FOUND => Step::Provision,
                        _ => Step::Fail(copied.into()),
                    }
                }
                Step::Provision => {
                    match TrashProvisioner::new(&self.target, &self.credentials)
                        .ensure_trash_containers(svc, &self.trash_container)
                        .await
                    {
                        Ok(()) => Step::RetryCopy,
                        Err(TrashError::Upstream(failure)) => Step::Fail(failure),
                        Err(TrashError::Service(err)) => return Err(err),
                    }
                }
                Step::RetryCopy => {
                    let copied = self.copy_to_trash(svc).await?;
                    if !copied.is_success() {
                        debug!(
                            "retried copy of {} answered {}; deleting anyway",
                            self.target.object_path(),
                            copied.status
                        );
                    }
                    Step::ForwardDelete
                }
                Step::ForwardDelete => return subrequest::forward(svc, delete).await,
                Step::Fail(failure) => {
                    warn!(
                        "not deleting {}: {}",
                        self.target.object_path(),
                        failure
                    );
                    return Ok(failure.into_response());
                }
            };
        }
    }

    async fn copy_to_trash<S>(&self, svc: &mut S) -> Result<UpstreamResponse, S::Error>
    where
        S: Service<Request<Body>, Response = Response<Body>>,
    {
        let destination = format!("{}/{}", self.trash_container, self.target.object);
        // No `multipart-manifest=get`: that would copy a large object's
        // manifest instead of its content.
        let mut copy =
            Subrequest::new("COPY", self.target.object_path()).header(DESTINATION, destination);
        if self.config.trash_lifetime > 0 {
            copy = copy.header(DELETE_AFTER, self.config.trash_lifetime.to_string());
        }
        copy.send(svc, &self.credentials).await
    }
}
