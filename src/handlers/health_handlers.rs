//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the upstream storage proxy

use crate::services::proxy_service::ProxyService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Liveness check: always 200 OK with a plain JSON body, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness check that calls the upstream `/healthcheck`. HTTP 200 when the
/// upstream answers with success, HTTP 503 otherwise.
pub async fn readyz(State(proxy): State<ProxyService>) -> impl IntoResponse {
    let upstream_check = match proxy.healthcheck().await {
        Ok(status) if status.is_success() => (true, None::<String>),
        Ok(status) => (false, Some(format!("upstream answered {}", status))),
        Err(e) => (false, Some(e.message)),
    };

    let overall_ok = upstream_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "upstream",
        CheckStatus {
            ok: upstream_check.0,
            error: upstream_check.1,
        },
    );

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
