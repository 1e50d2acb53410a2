use crate::state::AppState;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

mod activity;
mod products;
mod resolve;
mod webhooks;
mod workspaces;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(workspaces::router())
        .merge(products::router())
        .merge(activity::router())
        .merge(resolve::router())
        .merge(webhooks::router())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
