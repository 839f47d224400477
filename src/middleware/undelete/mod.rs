//! Copy-on-delete for object storage.
//!
//! [`UndeleteLayer`] wraps a storage service. Object DELETEs are preceded by
//! a COPY of the object into `<trash_prefix><container>`, whose containers are
//! created on first use. Deletes inside trash containers are never copied
//! again and can be refused outright with `block_trash_deletes`. Everything
//! else reaches the storage service untouched.

pub mod classifier;
pub mod orchestrator;
pub mod provisioner;
pub mod subrequest;

use crate::config::UndeleteConfig;
use axum::{
    body::Body,
    http::{Request, Response},
};
use classifier::{Classification, blocked_response, classify};
use futures::future::BoxFuture;
use orchestrator::Orchestrator;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::info;

#[derive(Debug, Clone)]
pub struct UndeleteLayer {
    config: Arc<UndeleteConfig>,
}

impl UndeleteLayer {
    pub fn new(config: UndeleteConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for UndeleteLayer {
    type Service = Undelete<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Undelete {
            inner,
            config: self.config.clone(),
        }
    }
}

/// The storage service wrapped with copy-on-delete.
///
/// Holds no per-request state; concurrent requests share only the immutable
/// config.
#[derive(Debug, Clone)]
pub struct Undelete<S> {
    inner: S,
    config: Arc<UndeleteConfig>,
}

impl<S> Service<Request<Body>> for Undelete<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();

        Box::pin(async move {
            match classify(&config, req.method(), req.uri().path()) {
                Classification::Passthrough => inner.call(req).await,
                Classification::Blocked => {
                    info!("refusing {} {}: trash deletes are blocked", req.method(), req.uri());
                    Ok(blocked_response())
                }
                Classification::Intercept(target) => {
                    let orchestrator = Orchestrator::new(&config, target, req.headers());
                    orchestrator.run(&mut inner, req).await
                }
            }
        })
    }
}
