use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use panel_store::{NewProduct, Product};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/products", post(create_product).get(list_products))
        .route("/api/v1/products/{name}", get(get_product))
}

async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.store.create_product(request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.store.list_products(true).await?))
}

async fn get_product(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.store.get_product_by_name(&name).await?))
}
