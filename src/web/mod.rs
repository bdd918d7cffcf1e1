//! Web server and API endpoints for the display controller.
//!
//! Exposes the status aggregate, the image-upload operation, service
//! and power control, and the Prometheus metrics endpoint.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use handlers::AppState;
pub use router::create_app;

use crate::error::{MirageError, Result};
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

/// Bind and serve the API until `shutdown` resolves.
pub async fn serve(
    config: WebConfig,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| MirageError::config(format!("invalid bind address: {}", e)))?;

    let app = create_app(state, &config);

    info!("starting mirage web server on http://{}", addr);
    info!("status endpoint: http://{}/status", addr);
    info!("metrics endpoint: http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MirageError::web_server(format!("failed to bind to address: {}", e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| MirageError::web_server(format!("server error: {}", e)))?;

    Ok(())
}
