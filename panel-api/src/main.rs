use anyhow::Result;
use panel_api::{app, AppState, Config};
use panel_orchestrator::{
    ComposeRuntime, DeploymentOrchestrator, GitCli, OrchestratorConfig,
};
use panel_provisioner::DatabaseProvisioner;
use panel_resolver::{ResolverConfig, TenantResolver};
use panel_store::db::{create_pool, run_migrations};
use panel_store::TenantStore;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "panel_api=info,panel_orchestrator=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        base_domain = %config.base_domain,
        db_path = %config.db_path.display(),
        "Starting panel-api"
    );

    let pool = create_pool(&config.db_path).await?;
    run_migrations(&pool).await?;
    let store = TenantStore::new(pool);

    let provisioner = Arc::new(DatabaseProvisioner::new(config.admin_config()));
    let runtime = Arc::new(ComposeRuntime::new(config.command_timeout_secs));
    let vcs = Arc::new(GitCli::new(config.command_timeout_secs));

    let orchestrator = Arc::new(DeploymentOrchestrator::new(
        store.clone(),
        provisioner,
        runtime,
        vcs,
        OrchestratorConfig {
            base_domain: config.base_domain.clone(),
            deployments_root: config.deployments_root.clone(),
            db_host: config.tenant_db_host.clone(),
            db_port: config.tenant_db_port,
            shared_max_tenants: config.shared_max_tenants,
        },
    ));

    let resolver = TenantResolver::new(
        store.clone(),
        ResolverConfig {
            base_domain: config.base_domain.clone(),
            panel_host: config.panel_host.clone(),
        },
    );

    let state = AppState {
        store,
        resolver,
        orchestrator,
        webhook_secret: config.webhook_secret.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
