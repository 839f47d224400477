//! Creates trash containers on demand.

use super::subrequest::Subrequest;
use crate::{
    errors::{TrashError, UpstreamFailure},
    models::request_path::ObjectPath,
};
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, Request, Response},
};
use tower::Service;
use tracing::{info, warn};

pub const VERSIONS_SUFFIX: &str = "-versions";

const VERSIONS_LOCATION: HeaderName = HeaderName::from_static("x-versions-location");

pub fn trash_container_name(prefix: &str, container: &str) -> String {
    format!("{}{}", prefix, container)
}

pub fn trash_versions_container_name(trash_container: &str) -> String {
    format!("{}{}", trash_container, VERSIONS_SUFFIX)
}

/// Creates the trash containers of one account, authorized as the caller.
pub struct TrashProvisioner<'a> {
    target: &'a ObjectPath,
    credentials: &'a HeaderMap,
}

impl<'a> TrashProvisioner<'a> {
    pub fn new(target: &'a ObjectPath, credentials: &'a HeaderMap) -> Self {
        Self {
            target,
            credentials,
        }
    }

    /// Create `<trash>-versions`, then `<trash>` versioned into it.
    ///
    /// Both PUTs are create-if-absent on the storage side, so running this
    /// twice (for instance from two racing deletes) is harmless. A failed
    /// versions container stops before the trash container is attempted.
    pub async fn ensure_trash_containers<S>(
        &self,
        svc: &mut S,
        trash_container: &str,
    ) -> Result<(), TrashError<S::Error>>
    where
        S: Service<Request<Body>, Response = Response<Body>>,
    {
        let versions_container = trash_versions_container_name(trash_container);

        let versions = Subrequest::new(
            "PUT",
            self.target.container_path(&versions_container),
        )
        .send(svc, self.credentials)
        .await
        .map_err(TrashError::Service)?;
        if !versions.is_success() {
            warn!(
                "creating {} in account {} failed with {}",
                versions_container, self.target.account, versions.status
            );
            return Err(UpstreamFailure::from(versions).into());
        }

        let trash = Subrequest::new("PUT", self.target.container_path(trash_container))
            .header(VERSIONS_LOCATION, versions_container)
            .send(svc, self.credentials)
            .await
            .map_err(TrashError::Service)?;
        if !trash.is_success() {
            warn!(
                "creating {} in account {} failed with {}",
                trash_container, self.target.account, trash.status
            );
            return Err(UpstreamFailure::from(trash).into());
        }

        info!(
            "trash container {} ready in account {}",
            trash_container, self.target.account
        );
        Ok(())
    }
}
