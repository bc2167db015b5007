//! HTTP server setup: static files, directory listings, and the reload endpoint.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::inject::inject_reload_script;
use crate::listing::{directory_listing, ListingRoot};
use crate::registry::{ClientRegistry, RELOAD_MESSAGE};
use crate::socket::{reload_socket, SharedRegistry, RELOAD_PATH};
use crate::watcher::ChangeWatcher;
use axum::{
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;

/// Build the application router.
///
/// The reload endpoint is always routed; every other path is served from
/// `root`, with the reload script injected into HTML when `live_reload` is set.
pub fn router(root: PathBuf, live_reload: bool, registry: SharedRegistry) -> Router {
    let listing: MethodRouter =
        get(directory_listing).with_state(ListingRoot(Arc::new(root.clone())));
    let files = ServeDir::new(root).fallback(listing);

    let app = Router::new()
        .route(RELOAD_PATH, get(reload_socket))
        .fallback_service(files)
        .with_state(registry);

    if live_reload {
        app.layer(middleware::from_fn(inject_reload_script))
    } else {
        app
    }
}

/// Run the file server until `cancel_token` is cancelled.
///
/// # Arguments
///
/// * `config` - Port, directory, and live reload settings
/// * `cancel_token` - Token that triggers graceful shutdown when cancelled
///
/// # Returns
///
/// Returns `Ok(())` once the server has shut down, or a `LiveServeError` if it could not start
///
/// # Errors
///
/// Returns an error if:
/// - The served directory cannot be resolved
/// - The filesystem watcher cannot be created
/// - The server fails to bind to the configured port
pub async fn run(config: ServerConfig, cancel_token: CancellationToken) -> Result<()> {
    run_with_registry(config, Arc::new(ClientRegistry::new()), cancel_token).await
}

/// Like [`run`], with reload clients tracked in the caller's `registry`.
///
/// # Errors
///
/// Fails under the same conditions as [`run`]
pub async fn run_with_registry(
    config: ServerConfig,
    registry: SharedRegistry,
    cancel_token: CancellationToken,
) -> Result<()> {
    tracing::info!("Initializing server");

    let root = config.root()?;

    let watch_task = if config.watch {
        tracing::info!("Live reload enabled");
        let watcher = ChangeWatcher::new(
            root.clone(),
            config.excluded_dirs.clone(),
            Duration::from_millis(config.debounce_ms),
        )?;
        let registry = registry.clone();
        Some(tokio::spawn(watcher.run(move || {
            let registry = registry.clone();
            async move {
                registry.broadcast(RELOAD_MESSAGE).await;
            }
        })))
    } else {
        None
    };

    let app = router(root.clone(), config.watch, registry);

    tracing::debug!("Routes configured");

    let address: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    tracing::info!("Binding server to address: {address}");
    let listener = tokio::net::TcpListener::bind(address).await?;

    tracing::info!("File server started at port {}", config.port);
    tracing::info!("Open your browser at http://localhost:{}", config.port);
    tracing::info!("Serving from: {}", root.display());

    let shutdown = cancel_token.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    if let Some(task) = watch_task {
        task.abort();
    }
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
