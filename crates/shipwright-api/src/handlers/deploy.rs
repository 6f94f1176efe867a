//! Deployment webhook handler.
//!
//! Validates and authenticates the request on the hot path, then hands the
//! deployment to the background pipeline and answers immediately. The
//! response says only that the request was accepted; completion is reported
//! to the evaluation endpoint out of band.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shipwright_core::DeploymentRequest;
use tracing::{info, instrument, warn};

use crate::{auth::validate_secret, AppState};

/// Response for an accepted deployment.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// Always `"accepted"`.
    pub status: &'static str,
    /// Human-readable confirmation.
    pub message: String,
    /// Task echoed from the request.
    pub task: String,
    /// Round echoed from the request.
    pub round: u8,
    /// When the request was accepted.
    pub received_at: DateTime<Utc>,
}

/// Error response with a sanitized message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: &'static str,
    /// Human-readable error description.
    pub message: String,
    /// Field-level detail when validation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Accepts a deployment webhook.
///
/// Returns:
/// - 422 when the payload does not deserialize or fails validation
/// - 401 when the presented secret does not match
/// - 500 when the service is missing its own configuration
/// - 200 once the deployment is queued
#[instrument(name = "deploy_webhook", skip(state, payload))]
pub async fn deploy_webhook(
    State(state): State<AppState>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "rejected malformed deployment payload");
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid request payload",
                Some(rejection.body_text()),
            );
        }
    };

    if let Err(e) = request.validate() {
        warn!(task = %request.task, error = %e, "rejected invalid deployment request");
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid request payload",
            Some(e.to_string()),
        );
    }

    let Some(configured_secret) = state.shared_secret.as_deref() else {
        warn!("deployment request received but no shared secret is configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "service is not configured to accept deployments",
            None,
        );
    };

    if !validate_secret(&request.secret, configured_secret) {
        warn!(task = %request.task, "rejected deployment with invalid secret");
        return error_response(StatusCode::UNAUTHORIZED, "invalid secret", None);
    }

    let Some(pipeline) = state.pipeline.clone() else {
        warn!("deployment request received but the pipeline is not configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "service is not configured to accept deployments",
            None,
        );
    };

    info!(task = %request.task, round = %request.round, "deployment accepted");

    let accepted = AcceptedResponse {
        status: "accepted",
        message: format!("Deployment for '{}' started", request.task),
        task: request.task.clone(),
        round: request.round.into(),
        received_at: Utc::now(),
    };

    tokio::spawn(async move {
        pipeline.run(request).await;
    });

    (StatusCode::OK, Json(accepted)).into_response()
}

fn error_response(status: StatusCode, message: &str, detail: Option<String>) -> Response {
    let body = ErrorResponse { status: "error", message: message.to_string(), detail };
    (status, Json(body)).into_response()
}
