use anyhow::Result;
use axum::Router;
use std::io::ErrorKind;
use swift_undelete::{config, routes, services::proxy_service::ProxyService};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting swift-undelete with config: {:?}", cfg);
    if cfg.undelete.trash_lifetime == 0 {
        tracing::info!("Trashed objects never expire");
    }

    // --- Upstream storage proxy ---
    let proxy = ProxyService::new(&cfg.upstream_url)?;
    tracing::info!("Forwarding storage requests to {}", proxy.base_url());

    // --- Build router ---
    let app: Router = routes::routes::routes(proxy, cfg.undelete.clone());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
