//! Defines the routes of the undelete proxy.
//!
//! ## Structure
//! - `GET /healthz` — liveness
//! - `GET /readyz`  — readiness (calls the upstream `/healthcheck`)
//! - everything else — the storage API, forwarded upstream through
//!   [`UndeleteLayer`], so object DELETEs save a trash copy first.

use crate::{
    config::UndeleteConfig,
    handlers::health_handlers::{healthz, readyz},
    middleware::{UndeleteLayer, logging_middleware},
    services::proxy_service::ProxyService,
};
use axum::{Router, middleware, routing::get};
use tower::Layer;

/// Build the router: health endpoints plus the storage API behind the
/// undelete layer.
pub fn routes(proxy: ProxyService, undelete: UndeleteConfig) -> Router {
    let storage = UndeleteLayer::new(undelete).layer(proxy.clone());

    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // storage API
        .fallback_service(storage)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(proxy)
}
