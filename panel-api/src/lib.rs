//! HTTP surface of the panel: workspace provisioning, tenant resolution,
//! and the push webhook that triggers redeploys.

pub mod config;
pub mod error;
pub mod routes;
pub mod signature;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
