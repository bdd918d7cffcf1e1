//! Web application router and middleware setup.

use crate::web::config::WebConfig;
use crate::web::handlers::{self, AppState};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the axum application with all routes and middleware.
pub fn create_app(state: AppState, config: &WebConfig) -> Router {
    let mut app = Router::new()
        .route("/status", get(handlers::get_status))
        .route("/display", post(handlers::update_display))
        .route("/metrics", get(handlers::get_metrics))
        .route("/api/health", get(handlers::health_check))
        .route("/system/service", post(handlers::control_service))
        .route("/system/power", post(handlers::control_power))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
