//! System/health API handlers.
//!
//! # Purpose and responsibility
//! Lightweight liveness and readiness endpoints for probes.
//!
//! # Key invariants and assumptions
//! - `ping` never touches a dependency.
//! - `health` probes the store and the directory and fails if either is down.
use crate::api::error::{ApiError, api_directory_unavailable, api_internal};
use crate::api::types::HealthStatus;
use crate::app::AppState;
use axum::Json;
use axum::extract::State;

#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "system",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub(crate) async fn ping() -> &'static str {
    "ok"
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Dependencies reachable", body = HealthStatus),
        (status = 500, description = "A dependency is unavailable", body = crate::api::types::ErrorResponse)
    )
)]
/// Probe the backing store and directory.
///
/// # Errors
/// - Returns 500 if either health check fails.
pub(crate) async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = state.store.health_check().await {
        return Err(api_internal("storage unavailable", &err));
    }
    if let Err(err) = state.directory.health_check().await {
        return Err(api_directory_unavailable(&err));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
        storage: state.store.backend_name().to_string(),
        directory: state.directory.backend_name().to_string(),
    }))
}
