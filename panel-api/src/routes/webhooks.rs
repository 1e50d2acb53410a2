//! Push webhook: verifies the HMAC signature over the raw body, filters
//! on branch, and hands qualifying pushes to the orchestrator's redeploy
//! path. Signature verification runs before the payload is parsed at all.

use crate::error::{ApiError, ApiResult};
use crate::signature::verify_signature;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const PRIMARY_BRANCHES: &[&str] = &["refs/heads/main", "refs/heads/master"];

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/webhooks/push/{product}", post(handle_push))
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
}

async fn handle_push(
    State(state): State<AppState>,
    Path(product): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if !verify_signature(&state.webhook_secret, &body, signature) {
        warn!(product, "Webhook signature mismatch");
        return Err(ApiError::Forbidden);
    }

    let payload: PushPayload = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid payload: {}", e)))?;

    if !PRIMARY_BRANCHES.contains(&payload.git_ref.as_str()) {
        info!(product, git_ref = %payload.git_ref, "Ignoring non-primary branch push");
        return Ok(Json(json!({ "success": true, "triggered": false })));
    }

    let outcome = state.orchestrator.redeploy(&product).await?;
    if !outcome.fully_succeeded() {
        // The pull leg worked; say so instead of masking it.
        let detail = match &outcome.restart {
            panel_orchestrator::RestartReport::Failed { detail } => detail.clone(),
            _ => String::new(),
        };
        return Err(ApiError::Internal(format!(
            "pull succeeded, restart failed: {}",
            detail
        )));
    }

    Ok(Json(json!({
        "success": true,
        "triggered": true,
        "deployment": outcome.deployment_name,
    })))
}
