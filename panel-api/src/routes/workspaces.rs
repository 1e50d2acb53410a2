//! Workspace provisioning and lifecycle endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use panel_orchestrator::ProvisionRequest;
use panel_store::{Deployment, DeploymentType, Tenant};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/workspaces", post(create_workspace).get(list_workspaces))
        .route("/api/v1/workspaces/{subdomain}", get(get_workspace))
        .route("/api/v1/workspaces/{subdomain}", delete(decommission_workspace))
        .route("/api/v1/workspaces/{subdomain}/suspend", post(suspend_workspace))
        .route("/api/v1/workspaces/{subdomain}/activate", post(activate_workspace))
        .route("/api/v1/workspaces/{subdomain}/mark-inactive", post(mark_inactive_workspace))
        .route("/api/v1/deployments/{name}", get(get_deployment))
        .route("/api/v1/deployments/{name}/retry", post(retry_deployment))
        .route("/api/v1/deployments/{name}/stop", post(stop_deployment))
}

#[derive(Debug, Deserialize)]
struct CreateWorkspaceRequest {
    product: String,
    subdomain: String,
    company_name: String,
    #[serde(rename = "type", default = "default_type")]
    deployment_type: DeploymentType,
    #[serde(default = "default_plan")]
    plan: String,
    #[serde(default)]
    owner: String,
}

fn default_type() -> DeploymentType {
    DeploymentType::Shared
}

fn default_plan() -> String {
    "free".to_string()
}

async fn create_workspace(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkspaceRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    info!(subdomain = %request.subdomain, product = %request.product, "Provisioning workspace");

    let outcome = state
        .orchestrator
        .provision(ProvisionRequest {
            product_name: request.product,
            subdomain: request.subdomain,
            company_name: request.company_name,
            deployment_type: request.deployment_type,
            plan: request.plan,
            owner: request.owner,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "url": outcome.url,
            "db_name": outcome.tenant.db_name,
            "deployment": outcome.deployment.name,
        })),
    ))
}

async fn list_workspaces(State(state): State<AppState>) -> ApiResult<Json<Vec<Tenant>>> {
    Ok(Json(state.store.list_tenants().await?))
}

async fn get_workspace(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.store.get_tenant_by_subdomain(&subdomain).await?))
}

async fn decommission_workspace(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.orchestrator.decommission(&subdomain).await?;
    Ok(Json(json!({ "success": true })))
}

async fn suspend_workspace(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.orchestrator.suspend(&subdomain).await?))
}

async fn activate_workspace(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.orchestrator.activate(&subdomain).await?))
}

async fn mark_inactive_workspace(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> ApiResult<Json<Tenant>> {
    Ok(Json(state.orchestrator.mark_inactive(&subdomain).await?))
}

async fn get_deployment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Deployment>> {
    Ok(Json(state.store.get_deployment_by_name(&name).await?))
}

async fn retry_deployment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Deployment>> {
    Ok(Json(state.orchestrator.retry(&name).await?))
}

async fn stop_deployment(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Deployment>> {
    Ok(Json(state.orchestrator.stop(&name).await?))
}
