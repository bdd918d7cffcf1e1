//! HTTP handlers for the controller API.

use crate::controller::{Controller, StatusReport};
use crate::error::MirageError;
use crate::system::{PowerAction, ServiceAction};
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl AsRef<str>) -> ApiError {
    (status, Json(json!({ "error": message.as_ref() })))
}

/// Map a driver/controller error to a response, keeping the bad-input
/// vs hardware-failure distinction.
fn error_response(err: &MirageError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if matches!(err, MirageError::LockTimeout(_)) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    api_error(status, err.to_string())
}

/// Full status aggregate: system, storage, and display health.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.controller.status().await)
}

/// Accept a multipart image upload and render it to the panel.
pub async fn update_display(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        api_error(StatusCode::BAD_REQUEST, format!("invalid upload: {}", e))
    })? {
        if field.name() == Some("image") {
            let filename = field.file_name().unwrap_or_default().to_string();
            if filename.is_empty() {
                return Err(api_error(StatusCode::BAD_REQUEST, "No selected file"));
            }
            let bytes = field.bytes().await.map_err(|e| {
                api_error(StatusCode::BAD_REQUEST, format!("invalid upload: {}", e))
            })?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No image file provided"))?;

    match state.controller.save_and_update(&filename, &bytes).await {
        Ok(_) => Ok(Json(json!({ "message": "Display updated successfully" }))),
        Err(err) => {
            error!(error = %err, "display update failed");
            Err(error_response(&err))
        }
    }
}

/// Prometheus text exposition of all metric families.
pub async fn get_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.controller.render_metrics() {
        Ok(body) => Ok((
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response()),
        Err(err) => {
            error!(error = %err, "metrics rendering failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

/// Liveness check.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "mirage",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[derive(Debug, Deserialize)]
pub struct ServiceRequest {
    pub action: ServiceAction,
}

/// Start, stop, or restart the managed service unit.
pub async fn control_service(
    State(state): State<AppState>,
    Json(request): Json<ServiceRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.controller.control_service(request.action).await {
        Ok(output) => Ok(Json(json!({ "message": output }))),
        Err(err) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

#[derive(Debug, Deserialize)]
pub struct PowerRequest {
    pub action: PowerAction,
}

/// Shut down or reboot the host.
pub async fn control_power(
    State(state): State<AppState>,
    Json(request): Json<PowerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.controller.control_power(request.action).await {
        Ok(output) => Ok(Json(json!({ "message": output }))),
        Err(err) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}
