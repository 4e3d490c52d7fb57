// ABOUTME: Process wiring for the hill binary
// ABOUTME: Logging setup, control plane server startup, and shutdown signalling

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::Router;
use hill_api::{create_router, AppState};
use hill_storage::ArtifactStore;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub mod config;

pub use config::ServeConfig;

/// Logs go to stderr so command output on stdout stays parseable.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };

    let origin = origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin: {origin}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any))
}

/// Open storage and build the router, without binding a socket
pub async fn build_app(config: &ServeConfig) -> anyhow::Result<Router> {
    let database_url = config.database_url();
    if config.database_url.is_none() {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    }

    let pool = hill_storage::connect(&database_url)
        .await
        .with_context(|| format!("opening database {database_url}"))?;
    let artifacts = ArtifactStore::new(config.artifacts_dir());

    let cors = cors_layer(config.cors_origin.as_deref())?;
    Ok(create_router(AppState::new(pool, artifacts)).layer(cors))
}

pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr()?;
    let app = build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, data_dir = %config.data_dir.display(), "Control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Control plane stopped");
    Ok(())
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_build_app_creates_data_dir_and_serves_health() {
        let dir = TempDir::new().unwrap();
        let config = ServeConfig {
            data_dir: dir.path().join("data"),
            ..ServeConfig::default()
        };

        let app = build_app(&config).await.unwrap();
        assert!(config.data_dir.join("hill.db").exists());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_origin_is_echoed() {
        let dir = TempDir::new().unwrap();
        let config = ServeConfig {
            data_dir: dir.path().to_path_buf(),
            cors_origin: Some("http://ops.example.com".to_string()),
            ..ServeConfig::default()
        };

        let app = build_app(&config).await.unwrap();
        let response = app
            .oneshot(
                Request::get("/queue")
                    .header("origin", "http://ops.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://ops.example.com"
        );
    }

    #[test]
    fn test_cors_layer_rejects_garbage_origin() {
        assert!(cors_layer(Some("bad\norigin")).is_err());
        assert!(cors_layer(None).is_ok());
    }
}
