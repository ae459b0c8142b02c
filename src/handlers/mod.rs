//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Personas API.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header::CONTENT_TYPE},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::error::{ApiError, not_found};
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod agents;
pub mod auth;
pub mod model_configs;
pub mod preferences;
pub mod providers;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Readiness probe verifying database connectivity
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Database unavailable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    crate::db::health_check(&state.db).await.map_err(|e| {
        tracing::error!("Health check failed: {:?}", e);
        ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database unavailable",
        )
    })?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Serve a stored avatar blob
#[utoipa::path(
    get,
    path = "/avatars/{owner}/{file}",
    responses(
        (status = 200, description = "Avatar image bytes"),
        (status = 404, description = "No such avatar", body = ApiError)
    ),
    tag = "avatars"
)]
pub async fn serve_avatar(
    State(state): State<AppState>,
    Path((owner, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    // Owner segment is always a UUID; anything else (including traversal
    // attempts) is a 404.
    if owner.parse::<Uuid>().is_err() || file.contains("..") || file.contains('/') {
        return Err(not_found("Avatar not found"));
    }

    let path = std::path::Path::new(&state.config.avatar_storage_root)
        .join(&owner)
        .join(&file);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(not_found("Avatar not found"));
        }
        Err(e) => return Err(ApiError::from(anyhow::Error::new(e))),
    };

    let content_type = match file.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));

    Ok((headers, bytes).into_response())
}
