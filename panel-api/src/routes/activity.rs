use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use panel_store::ActivityLog;
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/activity", get(recent_activity))
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

async fn recent_activity(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    Ok(Json(state.store.recent_activity(query.limit.clamp(1, 500)).await?))
}
