//! Tenant-facing entry point: maps the Host header to a request context.
//!
//! Downstream application servers call this to learn which database a
//! request must be bound to before issuing any tenant-scoped statement.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::routing::get;
use axum::{Json, Router};
use panel_resolver::RequestContext;
use serde_json::json;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/resolve", get(resolve_host))
}

async fn resolve_host(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let context = state
        .resolver
        .resolve(host)
        .await
        .map_err(ApiError::from)?;

    let body = match context {
        RequestContext::Admin => json!({ "context": "admin" }),
        RequestContext::NoTenant { subdomain } => json!({
            "context": "none",
            "subdomain": subdomain,
        }),
        RequestContext::Tenant(ctx) => json!({
            "context": "tenant",
            "subdomain": ctx.tenant.subdomain,
            "tenant_id": ctx.tenant.id,
            "database_url": ctx.database_url(),
        }),
    };

    Ok(Json(body))
}
