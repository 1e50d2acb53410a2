use crate::error::{OrchestratorError, Result};
use crate::locks::DeploymentLocks;
use crate::runtime::{ContainerRuntime, RestartOutcome};
use crate::template::{render_template, TemplateVars};
use crate::vcs::SourceControl;
use async_trait::async_trait;
use panel_core::{generate_password, generate_secret_key, sanitize_subdomain, validate_subdomain};
use panel_provisioner::DatabaseProvisioner;
use panel_store::{
    ActivityAction, Deployment, DeploymentStatus, DeploymentType, NewActivity, NewDeployment,
    NewTenant, Product, Tenant, TenantStatus, TenantStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Database provisioning as the orchestrator sees it. Implemented by the
/// real Postgres provisioner and by test doubles.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn ensure_database(
        &self,
        db_name: &str,
        db_user: &str,
        db_password: &str,
    ) -> panel_provisioner::Result<()>;

    async fn drop_database(&self, db_name: &str, db_user: &str) -> panel_provisioner::Result<()>;
}

#[async_trait]
impl Provisioner for panel_provisioner::DatabaseProvisioner {
    async fn ensure_database(
        &self,
        db_name: &str,
        db_user: &str,
        db_password: &str,
    ) -> panel_provisioner::Result<()> {
        DatabaseProvisioner::ensure_database(self, db_name, db_user, db_password).await
    }

    async fn drop_database(&self, db_name: &str, db_user: &str) -> panel_provisioner::Result<()> {
        DatabaseProvisioner::drop_database(self, db_name, db_user).await
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Suffix under which workspaces are reachable.
    pub base_domain: String,
    /// Root directory for rendered deployment trees.
    pub deployments_root: PathBuf,
    /// Host and port tenant applications use to reach Postgres.
    pub db_host: String,
    pub db_port: u16,
    /// Capacity of a newly created shared deployment.
    pub shared_max_tenants: i64,
}

#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub product_name: String,
    pub subdomain: String,
    pub company_name: String,
    pub deployment_type: DeploymentType,
    pub plan: String,
    pub owner: String,
}

#[derive(Debug, Clone)]
pub struct ProvisionOutcome {
    pub tenant: Tenant,
    pub deployment: Deployment,
    pub url: String,
}

/// Container restart leg of a redeploy, reported independently of the
/// source-pull leg so partial failures stay observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartReport {
    Restarted,
    UnitNotFound,
    Failed { detail: String },
}

#[derive(Debug, Clone)]
pub struct RedeployOutcome {
    pub deployment_name: String,
    pub pull_output: String,
    pub restart: RestartReport,
}

impl RedeployOutcome {
    pub fn fully_succeeded(&self) -> bool {
        !matches!(self.restart, RestartReport::Failed { .. })
    }
}

/// Owns the deployment state machine and every external side effect of
/// provisioning: database DDL, artifact rendering, and container commands.
#[derive(Clone)]
pub struct DeploymentOrchestrator {
    store: TenantStore,
    provisioner: Arc<dyn Provisioner>,
    runtime: Arc<dyn ContainerRuntime>,
    vcs: Arc<dyn SourceControl>,
    config: OrchestratorConfig,
    locks: DeploymentLocks,
}

impl DeploymentOrchestrator {
    pub fn new(
        store: TenantStore,
        provisioner: Arc<dyn Provisioner>,
        runtime: Arc<dyn ContainerRuntime>,
        vcs: Arc<dyn SourceControl>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            provisioner,
            runtime,
            vcs,
            config,
            locks: DeploymentLocks::new(),
        }
    }

    pub fn store(&self) -> &TenantStore {
        &self.store
    }

    /// Provision a new workspace end to end: database, placement, first
    /// deploy.
    ///
    /// Validation and uniqueness conflicts reject before any side effect.
    /// A launch failure leaves the tenant row in place with
    /// `is_deployed = false` and the deployment in `error`; retry is an
    /// explicit operator action.
    #[instrument(skip(self, request), fields(subdomain = %request.subdomain, product = %request.product_name))]
    pub async fn provision(&self, request: ProvisionRequest) -> Result<ProvisionOutcome> {
        validate_subdomain(&request.subdomain)?;

        let product = self.store.get_product_by_name(&request.product_name).await?;
        if !product.is_active {
            return Err(OrchestratorError::Conflict(format!(
                "product {} is not accepting new workspaces",
                product.name
            )));
        }
        match request.deployment_type {
            DeploymentType::Shared if !product.supports_shared => {
                return Err(OrchestratorError::Conflict(format!(
                    "product {} does not support shared placement",
                    product.name
                )));
            }
            DeploymentType::Dedicated if !product.supports_dedicated => {
                return Err(OrchestratorError::Conflict(format!(
                    "product {} does not support dedicated placement",
                    product.name
                )));
            }
            _ => {}
        }

        if self.store.subdomain_exists(&request.subdomain).await? {
            return Err(OrchestratorError::Conflict(format!(
                "subdomain {} already in use",
                request.subdomain
            )));
        }

        let safe = sanitize_subdomain(&request.subdomain);
        let db_name = format!("tenant_{}", safe);
        let db_user = format!("user_{}", safe);
        let db_password = generate_password(24);

        self.provisioner
            .ensure_database(&db_name, &db_user, &db_password)
            .await?;

        let (deployment, needs_launch) = self
            .place(&product, request.deployment_type, &request.subdomain)
            .await?;

        let tenant = match self
            .store
            .create_tenant(NewTenant {
                subdomain: request.subdomain.clone(),
                company_name: request.company_name.clone(),
                product_id: product.id.clone(),
                deployment_id: deployment.id.clone(),
                plan: request.plan.clone(),
                owner: request.owner.clone(),
                db_name,
                db_user,
                db_password,
                db_host: self.config.db_host.clone(),
                db_port: self.config.db_port,
            })
            .await
        {
            Ok(tenant) => tenant,
            Err(err) => {
                // Lost a race on the unique subdomain; give the slot back.
                self.store.release_slot(&deployment.id).await?;
                return Err(err.into());
            }
        };

        self.log_activity(NewActivity {
            tenant_id: Some(tenant.id.clone()),
            deployment_id: Some(deployment.id.clone()),
            user: Some(request.owner.clone()),
            action: ActivityAction::Create,
            description: format!(
                "Created workspace {} on {} ({:?})",
                tenant.subdomain, deployment.name, request.deployment_type
            ),
            ip_address: None,
        })
        .await;

        if needs_launch {
            self.launch(&product, &deployment, &tenant).await?;
        } else {
            // Reusing a running shared unit: nothing to render or start.
            self.store.mark_tenant_deployed(&tenant.id).await?;
            info!(subdomain = %tenant.subdomain, deployment = %deployment.name, "Placed on running shared deployment");
        }

        let tenant = self.store.get_tenant(&tenant.id).await?;
        let deployment = self.store.get_deployment(&deployment.id).await?;
        let url = tenant.url(&self.config.base_domain);

        Ok(ProvisionOutcome {
            tenant,
            deployment,
            url,
        })
    }

    /// Placement decision: reuse shared capacity when it exists, otherwise
    /// create a new deployment record headed for render-and-launch.
    async fn place(
        &self,
        product: &Product,
        deployment_type: DeploymentType,
        subdomain: &str,
    ) -> Result<(Deployment, bool)> {
        match deployment_type {
            DeploymentType::Shared => {
                if let Some(existing) = self.store.find_available_shared(&product.id).await? {
                    // The slot claim re-checks capacity atomically; a race
                    // loser falls through to a fresh deployment.
                    if self.store.reserve_slot(&existing.id).await? {
                        return Ok((existing, false));
                    }
                }

                let deployment = self.create_shared_deployment(product).await?;
                if !self.store.reserve_slot(&deployment.id).await? {
                    return Err(OrchestratorError::Conflict(format!(
                        "deployment {} is at capacity",
                        deployment.name
                    )));
                }
                Ok((deployment, true))
            }
            DeploymentType::Dedicated => {
                let deployment = self
                    .store
                    .create_deployment(NewDeployment {
                        name: format!("{}-{}", product.name, subdomain),
                        product_id: product.id.clone(),
                        deployment_type: DeploymentType::Dedicated,
                        max_tenants: Some(1),
                    })
                    .await?;
                if !self.store.reserve_slot(&deployment.id).await? {
                    return Err(OrchestratorError::Conflict(format!(
                        "deployment {} is at capacity",
                        deployment.name
                    )));
                }
                Ok((deployment, true))
            }
        }
    }

    async fn create_shared_deployment(&self, product: &Product) -> Result<Deployment> {
        let base_name = format!("{}-shared", product.name);
        let request = NewDeployment {
            name: base_name.clone(),
            product_id: product.id.clone(),
            deployment_type: DeploymentType::Shared,
            max_tenants: Some(self.config.shared_max_tenants),
        };

        match self.store.create_deployment(request.clone()).await {
            Ok(deployment) => Ok(deployment),
            // The base name is taken by a full or failed unit; suffix a
            // fresh one.
            Err(panel_store::StoreError::Conflict(_)) => {
                let suffix = &Uuid::new_v4().to_string()[..8];
                Ok(self
                    .store
                    .create_deployment(NewDeployment {
                        name: format!("{}-{}", base_name, suffix),
                        ..request
                    })
                    .await?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Render artifacts and bring the unit up, serialized per deployment
    /// name. Every failure path writes `error` plus a message before
    /// returning.
    async fn launch(
        &self,
        product: &Product,
        deployment: &Deployment,
        tenant: &Tenant,
    ) -> Result<()> {
        let _guard = self.locks.acquire(&deployment.name).await;

        match self.render_and_launch(product, deployment, tenant).await {
            Ok(()) => {
                self.store.mark_deployment_active(&deployment.id).await?;
                self.store.mark_tenant_deployed(&tenant.id).await?;
                self.log_activity(NewActivity {
                    tenant_id: Some(tenant.id.clone()),
                    deployment_id: Some(deployment.id.clone()),
                    user: None,
                    action: ActivityAction::Deploy,
                    description: format!("Deployed {}", deployment.name),
                    ip_address: None,
                })
                .await;
                info!(deployment = %deployment.name, "Deployment active");
                Ok(())
            }
            Err(err) => {
                error!(deployment = %deployment.name, error = %err, "Deploy failed");
                self.store
                    .update_deployment_status(
                        &deployment.id,
                        DeploymentStatus::Error,
                        Some(err.to_string()),
                    )
                    .await?;
                self.log_activity(NewActivity {
                    tenant_id: Some(tenant.id.clone()),
                    deployment_id: Some(deployment.id.clone()),
                    user: None,
                    action: ActivityAction::Deploy,
                    description: format!("Deploy of {} failed: {}", deployment.name, err),
                    ip_address: None,
                })
                .await;
                Err(err)
            }
        }
    }

    async fn render_and_launch(
        &self,
        product: &Product,
        deployment: &Deployment,
        tenant: &Tenant,
    ) -> Result<()> {
        let template_path = product
            .template_path
            .as_deref()
            .ok_or_else(|| OrchestratorError::TemplateMissing(product.name.clone()))?;

        let dest = self.config.deployments_root.join(&deployment.name);
        let vars = TemplateVars {
            workspace_name: deployment.name.clone(),
            schema_name: sanitize_subdomain(&tenant.subdomain),
            subdomain: tenant.subdomain.clone(),
            base_domain: self.config.base_domain.clone(),
            db_name: tenant.db_name.clone(),
            db_user: tenant.db_user.clone(),
            db_password: tenant.db_password.clone(),
            secret_key: generate_secret_key(),
        };

        let compose = render_template(Path::new(template_path), &dest, &vars)?;

        self.store
            .set_deployment_artifacts(&deployment.id, &dest.display().to_string(), &compose)
            .await?;
        self.store
            .set_tenant_project(&tenant.id, Some(&dest.display().to_string()), None)
            .await?;

        self.runtime.compose_up(&dest).await?;

        Ok(())
    }

    /// Pull latest source and restart the product's running unit.
    ///
    /// The pull and restart legs are reported independently: a pull
    /// failure skips the restart entirely, while a restart failure after a
    /// good pull comes back as a partial outcome instead of an `Err`.
    #[instrument(skip(self))]
    pub async fn redeploy(&self, product_name: &str) -> Result<RedeployOutcome> {
        let product = self.store.get_product_by_name(product_name).await?;
        let deployment = self
            .store
            .find_product_deployment(&product.id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::NotFound(format!("no deployment for product {}", product.name))
            })?;

        let _guard = self.locks.acquire(&deployment.name).await;

        let path: PathBuf = deployment
            .physical_path
            .clone()
            .or_else(|| product.template_path.clone())
            .ok_or_else(|| OrchestratorError::ProjectMissing(deployment.name.clone()))?
            .into();
        if !path.is_dir() {
            return Err(OrchestratorError::ProjectMissing(deployment.name.clone()));
        }

        let pull_output = match self.vcs.pull(&path).await {
            Ok(output) => output,
            Err(err) => {
                self.store
                    .update_deployment_status(
                        &deployment.id,
                        DeploymentStatus::Error,
                        Some(err.to_string()),
                    )
                    .await?;
                self.log_activity(NewActivity {
                    tenant_id: None,
                    deployment_id: Some(deployment.id.clone()),
                    user: None,
                    action: ActivityAction::Redeploy,
                    description: format!(
                        "Redeploy of {}: pull failed ({}), restart skipped",
                        deployment.name, err
                    ),
                    ip_address: None,
                })
                .await;
                return Err(err);
            }
        };

        let restart = match self.runtime.restart_unit(&deployment.name).await {
            Ok(RestartOutcome::Restarted) => {
                self.store
                    .update_deployment_status(&deployment.id, DeploymentStatus::Active, None)
                    .await?;
                RestartReport::Restarted
            }
            Ok(RestartOutcome::NotFound) => {
                warn!(unit = %deployment.name, "No running unit to restart");
                RestartReport::UnitNotFound
            }
            Err(err) => {
                self.store
                    .update_deployment_status(
                        &deployment.id,
                        DeploymentStatus::Error,
                        Some(err.to_string()),
                    )
                    .await?;
                RestartReport::Failed {
                    detail: err.to_string(),
                }
            }
        };

        // One entry summarizing both legs, whatever happened.
        self.log_activity(NewActivity {
            tenant_id: None,
            deployment_id: Some(deployment.id.clone()),
            user: None,
            action: ActivityAction::Redeploy,
            description: format!(
                "Redeploy of {}: pull ok, restart {}",
                deployment.name,
                match &restart {
                    RestartReport::Restarted => "ok".to_string(),
                    RestartReport::UnitNotFound => "skipped (unit not found)".to_string(),
                    RestartReport::Failed { detail } => format!("failed ({})", detail),
                }
            ),
            ip_address: None,
        })
        .await;

        Ok(RedeployOutcome {
            deployment_name: deployment.name,
            pull_output,
            restart,
        })
    }

    /// Tear a workspace down: database, tenant row, and, for a dedicated
    /// unit, the deployment record and its rendered tree.
    #[instrument(skip(self))]
    pub async fn decommission(&self, subdomain: &str) -> Result<()> {
        let tenant = self.store.get_tenant_by_subdomain(subdomain).await?;
        let deployment = self.store.get_deployment(&tenant.deployment_id).await?;

        let _guard = self.locks.acquire(&deployment.name).await;

        self.provisioner
            .drop_database(&tenant.db_name, &tenant.db_user)
            .await?;

        self.store.delete_tenant(&tenant.id).await?;
        self.store.release_slot(&deployment.id).await?;

        if deployment.deployment_type == DeploymentType::Dedicated {
            if let Some(path) = &deployment.physical_path {
                let path = PathBuf::from(path);
                if path.is_dir() {
                    std::fs::remove_dir_all(&path)?;
                }
            }
            self.store.delete_deployment(&deployment.id).await?;
        }

        self.log_activity(NewActivity {
            tenant_id: None,
            deployment_id: None,
            user: None,
            action: ActivityAction::Delete,
            description: format!("Decommissioned workspace {}", subdomain),
            ip_address: None,
        })
        .await;
        info!(subdomain, "Workspace decommissioned");

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn suspend(&self, subdomain: &str) -> Result<Tenant> {
        self.set_tenant_status(subdomain, TenantStatus::Suspended, ActivityAction::Suspend)
            .await
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, subdomain: &str) -> Result<Tenant> {
        self.set_tenant_status(subdomain, TenantStatus::Active, ActivityAction::Activate)
            .await
    }

    /// Soft retirement: the workspace stops resolving but its database
    /// and rows stay intact, unlike decommission.
    #[instrument(skip(self))]
    pub async fn mark_inactive(&self, subdomain: &str) -> Result<Tenant> {
        self.set_tenant_status(subdomain, TenantStatus::Inactive, ActivityAction::Update)
            .await
    }

    async fn set_tenant_status(
        &self,
        subdomain: &str,
        status: TenantStatus,
        action: ActivityAction,
    ) -> Result<Tenant> {
        let tenant = self.store.get_tenant_by_subdomain(subdomain).await?;
        self.store.update_tenant_status(&tenant.id, status).await?;

        self.log_activity(NewActivity {
            tenant_id: Some(tenant.id.clone()),
            deployment_id: Some(tenant.deployment_id.clone()),
            user: None,
            action,
            description: format!("Workspace {} set to {:?}", subdomain, status),
            ip_address: None,
        })
        .await;

        Ok(self.store.get_tenant(&tenant.id).await?)
    }

    /// Re-run the launch path for a deployment stuck in `error`.
    #[instrument(skip(self))]
    pub async fn retry(&self, deployment_name: &str) -> Result<Deployment> {
        let deployment = self.store.get_deployment_by_name(deployment_name).await?;
        if deployment.status != DeploymentStatus::Error {
            return Err(OrchestratorError::Conflict(format!(
                "deployment {} is {:?}, only failed deployments can be retried",
                deployment.name, deployment.status
            )));
        }

        let tenant = self
            .store
            .find_tenant_for_deployment(&deployment.id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::NotFound(format!("no tenant on deployment {}", deployment.name))
            })?;
        let product = self.store.get_product(&deployment.product_id).await?;

        self.store
            .update_deployment_status(&deployment.id, DeploymentStatus::Deploying, None)
            .await?;

        self.launch(&product, &deployment, &tenant).await?;

        Ok(self.store.get_deployment(&deployment.id).await?)
    }

    /// Record an explicit stop. The running unit is left to the operator;
    /// the record transition keeps the state machine honest.
    #[instrument(skip(self))]
    pub async fn stop(&self, deployment_name: &str) -> Result<Deployment> {
        let deployment = self.store.get_deployment_by_name(deployment_name).await?;
        if deployment.status != DeploymentStatus::Active {
            return Err(OrchestratorError::Conflict(format!(
                "deployment {} is {:?}, only active deployments can be stopped",
                deployment.name, deployment.status
            )));
        }

        self.store
            .update_deployment_status(&deployment.id, DeploymentStatus::Stopped, None)
            .await?;

        self.log_activity(NewActivity {
            tenant_id: None,
            deployment_id: Some(deployment.id.clone()),
            user: None,
            action: ActivityAction::Update,
            description: format!("Stopped deployment {}", deployment.name),
            ip_address: None,
        })
        .await;

        Ok(self.store.get_deployment(&deployment.id).await?)
    }

    /// Audit logging never fails the operation it describes.
    async fn log_activity(&self, entry: NewActivity) {
        if let Err(err) = self.store.record_activity(entry).await {
            warn!(error = %err, "Failed to write activity log entry");
        }
    }
}
