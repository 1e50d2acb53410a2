use crate::error::{Result, StoreError};
use crate::models::{
    ActivityAction, ActivityLog, Deployment, DeploymentStatus, DeploymentType, NewActivity,
    NewDeployment, NewProduct, NewTenant, Product, Tenant, TenantStatus,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Typed access to the control-plane tables.
#[derive(Clone)]
pub struct TenantStore {
    pool: SqlitePool,
}

impl TenantStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ---- products ----

    pub async fn create_product(&self, req: NewProduct) -> Result<Product> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO products (id, name, display_name, backend_image, frontend_image,
                                  template_path, supports_shared, supports_dedicated,
                                  is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.display_name)
        .bind(&req.backend_image)
        .bind(&req.frontend_image)
        .bind(&req.template_path)
        .bind(req.supports_shared)
        .bind(req.supports_dedicated)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::conflict_on_unique(e, &format!("product {} already exists", req.name)))?;

        self.get_product(&id).await
    }

    pub async fn get_product(&self, id: &str) -> Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;

        Ok(row.into())
    }

    pub async fn get_product_by_name(&self, name: &str) -> Result<Product> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {}", name)))?;

        Ok(row.into())
    }

    pub async fn list_products(&self, active_only: bool) -> Result<Vec<Product>> {
        let query = if active_only {
            "SELECT * FROM products WHERE is_active = 1 ORDER BY display_name"
        } else {
            "SELECT * FROM products ORDER BY display_name"
        };

        let rows = sqlx::query_as::<_, ProductRow>(query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }

    // ---- deployments ----

    pub async fn create_deployment(&self, req: NewDeployment) -> Result<Deployment> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO deployments (id, name, product_id, deployment_type, status,
                                     max_tenants, current_tenants, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.product_id)
        .bind(req.deployment_type)
        .bind(DeploymentStatus::Deploying)
        .bind(req.max_tenants)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StoreError::conflict_on_unique(e, &format!("deployment {} already exists", req.name))
        })?;

        self.get_deployment(&id).await
    }

    pub async fn get_deployment(&self, id: &str) -> Result<Deployment> {
        let row = sqlx::query_as::<_, DeploymentRow>("SELECT * FROM deployments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("deployment {}", id)))?;

        Ok(row.into())
    }

    pub async fn get_deployment_by_name(&self, name: &str) -> Result<Deployment> {
        let row = sqlx::query_as::<_, DeploymentRow>("SELECT * FROM deployments WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("deployment {}", name)))?;

        Ok(row.into())
    }

    /// Find a shared deployment of the product that still has spare
    /// capacity. Deployments in `error` or `stopped` state are never reused.
    pub async fn find_available_shared(&self, product_id: &str) -> Result<Option<Deployment>> {
        let row = sqlx::query_as::<_, DeploymentRow>(
            r#"
            SELECT * FROM deployments
            WHERE product_id = ?
              AND deployment_type = 'shared'
              AND status IN ('active', 'deploying')
              AND (max_tenants IS NULL OR current_tenants < max_tenants)
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into()))
    }

    /// The deployment a product-level redeploy targets: the shared unit if
    /// one exists, otherwise the oldest deployment of the product.
    pub async fn find_product_deployment(&self, product_id: &str) -> Result<Option<Deployment>> {
        let row = sqlx::query_as::<_, DeploymentRow>(
            r#"
            SELECT * FROM deployments
            WHERE product_id = ?
            ORDER BY (deployment_type = 'shared') DESC, created_at
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into()))
    }

    /// Claim a tenant slot on a deployment. The capacity guard lives in the
    /// UPDATE itself so two concurrent claims cannot both take the last
    /// slot. Returns false when the deployment is already full.
    pub async fn reserve_slot(&self, deployment_id: &str) -> Result<bool> {
        let now = Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET current_tenants = current_tenants + 1, updated_at = ?
            WHERE id = ?
              AND (max_tenants IS NULL OR current_tenants < max_tenants)
            "#,
        )
        .bind(now)
        .bind(deployment_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn release_slot(&self, deployment_id: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE deployments
            SET current_tenants = MAX(current_tenants - 1, 0), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(deployment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update_deployment_status(
        &self,
        id: &str,
        status: DeploymentStatus,
        error_message: Option<String>,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            "UPDATE deployments SET status = ?, error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(error_message)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist the rendered artifacts: physical path and the compose
    /// snapshot kept for audit/replay.
    pub async fn set_deployment_artifacts(
        &self,
        id: &str,
        physical_path: &str,
        compose_content: &str,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            "UPDATE deployments SET physical_path = ?, compose_content = ?, updated_at = ? WHERE id = ?",
        )
        .bind(physical_path)
        .bind(compose_content)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn mark_deployment_active(&self, id: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE deployments
            SET status = 'active', error_message = NULL, deployed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_deployment(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM deployments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("deployment {}", id)));
        }

        Ok(())
    }

    // ---- tenants ----

    pub async fn create_tenant(&self, req: NewTenant) -> Result<Tenant> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO tenants (id, subdomain, company_name, product_id, deployment_id,
                                 plan, status, db_name, db_user, db_password, db_host,
                                 db_port, owner, is_deployed, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.subdomain)
        .bind(&req.company_name)
        .bind(&req.product_id)
        .bind(&req.deployment_id)
        .bind(&req.plan)
        .bind(&req.db_name)
        .bind(&req.db_user)
        .bind(&req.db_password)
        .bind(&req.db_host)
        .bind(req.db_port)
        .bind(&req.owner)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StoreError::conflict_on_unique(e, &format!("subdomain {} already in use", req.subdomain))
        })?;

        self.get_tenant(&id).await
    }

    pub async fn subdomain_exists(&self, subdomain: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tenants WHERE subdomain = ?")
            .bind(subdomain)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn get_tenant(&self, id: &str) -> Result<Tenant> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", id)))?;

        Ok(row.into())
    }

    pub async fn get_tenant_by_subdomain(&self, subdomain: &str) -> Result<Tenant> {
        let row = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants WHERE subdomain = ?")
            .bind(subdomain)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("tenant {}", subdomain)))?;

        Ok(row.into())
    }

    /// Single lookup used by the request-time resolver: an exact subdomain
    /// match with `active` status, or nothing.
    pub async fn find_active_tenant(&self, subdomain: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT * FROM tenants WHERE subdomain = ? AND status = 'active'",
        )
        .bind(subdomain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into()))
    }

    /// The oldest tenant on a deployment. Used when a failed deployment is
    /// retried and its launch context must be reconstructed.
    pub async fn find_tenant_for_deployment(&self, deployment_id: &str) -> Result<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT * FROM tenants WHERE deployment_id = ? ORDER BY created_at LIMIT 1",
        )
        .bind(deployment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.into()))
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>> {
        let rows = sqlx::query_as::<_, TenantRow>("SELECT * FROM tenants ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }

    pub async fn update_tenant_status(&self, id: &str, status: TenantStatus) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query("UPDATE tenants SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn set_tenant_project(
        &self,
        id: &str,
        project_path: Option<&str>,
        repo_url: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query("UPDATE tenants SET project_path = ?, repo_url = ?, updated_at = ? WHERE id = ?")
            .bind(project_path)
            .bind(repo_url)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn mark_tenant_deployed(&self, id: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            "UPDATE tenants SET is_deployed = 1, deployed_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn delete_tenant(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("tenant {}", id)));
        }

        Ok(())
    }

    // ---- activity log ----

    pub async fn record_activity(&self, req: NewActivity) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO activity_log (id, tenant_id, deployment_id, user, action,
                                      description, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.tenant_id)
        .bind(&req.deployment_id)
        .bind(&req.user)
        .bind(req.action)
        .bind(&req.description)
        .bind(&req.ip_address)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn recent_activity(&self, limit: i64) -> Result<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT * FROM activity_log ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }
}

// Internal row types for sqlx
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    display_name: String,
    backend_image: Option<String>,
    frontend_image: Option<String>,
    template_path: Option<String>,
    supports_shared: bool,
    supports_dedicated: bool,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct DeploymentRow {
    id: String,
    name: String,
    product_id: String,
    deployment_type: DeploymentType,
    status: DeploymentStatus,
    physical_path: Option<String>,
    compose_content: Option<String>,
    max_tenants: Option<i64>,
    current_tenants: i64,
    error_message: Option<String>,
    deployed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct TenantRow {
    id: String,
    subdomain: String,
    company_name: String,
    product_id: String,
    deployment_id: String,
    plan: String,
    status: TenantStatus,
    db_name: String,
    db_user: String,
    db_password: String,
    db_host: String,
    db_port: i64,
    project_path: Option<String>,
    repo_url: Option<String>,
    owner: String,
    is_deployed: bool,
    deployed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: String,
    tenant_id: Option<String>,
    deployment_id: Option<String>,
    user: Option<String>,
    action: ActivityAction,
    description: String,
    ip_address: Option<String>,
    created_at: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            display_name: row.display_name,
            backend_image: row.backend_image,
            frontend_image: row.frontend_image,
            template_path: row.template_path,
            supports_shared: row.supports_shared,
            supports_dedicated: row.supports_dedicated,
            is_active: row.is_active,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap(),
        }
    }
}

impl From<DeploymentRow> for Deployment {
    fn from(row: DeploymentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            product_id: row.product_id,
            deployment_type: row.deployment_type,
            status: row.status,
            physical_path: row.physical_path,
            compose_content: row.compose_content,
            max_tenants: row.max_tenants,
            current_tenants: row.current_tenants,
            error_message: row.error_message,
            deployed_at: row
                .deployed_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap(),
        }
    }
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Self {
            id: row.id,
            subdomain: row.subdomain,
            company_name: row.company_name,
            product_id: row.product_id,
            deployment_id: row.deployment_id,
            plan: row.plan,
            status: row.status,
            db_name: row.db_name,
            db_user: row.db_user,
            db_password: row.db_password,
            db_host: row.db_host,
            db_port: row.db_port as u16,
            project_path: row.project_path,
            repo_url: row.repo_url,
            owner: row.owner,
            is_deployed: row.is_deployed,
            deployed_at: row
                .deployed_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).unwrap(),
        }
    }
}

impl From<ActivityRow> for ActivityLog {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            deployment_id: row.deployment_id,
            user: row.user,
            action: row.action,
            description: row.description,
            ip_address: row.ip_address,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
        }
    }
}
