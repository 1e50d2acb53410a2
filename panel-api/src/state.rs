use panel_orchestrator::DeploymentOrchestrator;
use panel_resolver::TenantResolver;
use panel_store::TenantStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: TenantStore,
    pub resolver: TenantResolver,
    pub orchestrator: Arc<DeploymentOrchestrator>,
    pub webhook_secret: String,
}
