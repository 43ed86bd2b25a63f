use std::net::SocketAddr;

use anyhow::Context;
use http::HeaderValue;
use tokio::signal;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    timeout::TimeoutLayer,
};
use tracing::{error, info, warn};

use woid_portal as portal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = portal::config::load_config().context("failed to load configuration")?;
    portal::config::init_tracing(&cfg.log_level, cfg.log_json);

    if cfg.is_production_backend() {
        info!(backend = %cfg.backend_url, "connected to the production backend deployment");
    } else {
        info!(backend = %cfg.backend_url, "connected to a development backend deployment");
    }

    let cors_layer = cors_layer(&cfg)?;

    let host = cfg.host.clone();
    let port = cfg.port;
    let timeout = cfg.request_timeout();

    let state = portal::AppState::from_config(cfg).context("failed to create backend client")?;
    let app = portal::build_router(state)
        .context("failed to build router")?
        // twice the per-call backend timeout
        .layer(TimeoutLayer::new(timeout * 2))
        .layer(CompressionLayer::new())
        .layer(cors_layer);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;
    info!("woid-portal listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("woid-portal stopped");
    Ok(())
}

fn cors_layer(cfg: &portal::config::AppConfig) -> anyhow::Result<CorsLayer> {
    let origins: Vec<HeaderValue> = cfg
        .cors
        .origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "skipping malformed CORS origin");
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        return Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(cfg.cors.allow_credentials));
    }
    if cfg.permissive_cors() {
        info!(environment = %cfg.environment, "no CORS origins listed, allowing any origin");
        return Ok(CorsLayer::permissive());
    }
    anyhow::bail!("no usable CORS origins: set APP__CORS__ALLOWED_ORIGINS or APP__CORS__ALLOW_ANY_ORIGIN=true")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
