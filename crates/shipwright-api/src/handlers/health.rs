//! Service info and health handlers.

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::AppState;

/// Root service banner.
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    /// Always `"running"`.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status, `"healthy"` or `"degraded"`.
    pub status: &'static str,
    /// Per-collaborator configuration state.
    pub services: ServiceChecks,
}

/// Configuration state of each collaborator.
#[derive(Debug, Serialize)]
pub struct ServiceChecks {
    /// Code generation gateway.
    pub codegen: &'static str,
    /// Git hosting provider.
    pub hosting: &'static str,
}

/// GET `/` service banner.
pub async fn root_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "running",
        service: "shipwright",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET `/health` configuration health check.
///
/// Reports degraded rather than failing when a collaborator is missing its
/// credentials, so orchestration keeps the service up for reconfiguration.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let codegen = if state.codegen_ready { "configured" } else { "unconfigured" };
    let hosting = if state.hosting_ready { "configured" } else { "unconfigured" };
    let status = if state.codegen_ready && state.hosting_ready { "healthy" } else { "degraded" };
    Json(HealthResponse { status, services: ServiceChecks { codegen, hosting } })
}
