use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A deployable application kind (ERP, inventory, storefront, ...).
///
/// Created once by an operator; read-only afterwards except for image and
/// template updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub backend_image: Option<String>,
    pub frontend_image: Option<String>,
    pub template_path: Option<String>,
    pub supports_shared: bool,
    pub supports_dedicated: bool,
    pub is_active: bool,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(serialize_with = "serialize_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    Shared,
    Dedicated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStatus {
    Deploying,
    Active,
    Error,
    Stopped,
}

/// A physical running unit of a Product.
///
/// Shared deployments serve many tenants; dedicated deployments serve
/// exactly one (`current_tenants` is 0 or 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub name: String,
    pub product_id: String,
    pub deployment_type: DeploymentType,
    pub status: DeploymentStatus,
    pub physical_path: Option<String>,
    pub compose_content: Option<String>,
    pub max_tenants: Option<i64>,
    pub current_tenants: i64,
    pub error_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "serialize_optional_datetime")]
    pub deployed_at: Option<DateTime<Utc>>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(serialize_with = "serialize_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Deployment {
    /// Whether this deployment can accept another tenant.
    pub fn is_available(&self) -> bool {
        match self.deployment_type {
            DeploymentType::Dedicated => self.current_tenants == 0,
            DeploymentType::Shared => self
                .max_tenants
                .map(|max| self.current_tenants < max)
                .unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Inactive,
}

/// A workspace: one customer's isolated instance of a product, keyed by
/// subdomain. The subdomain is immutable once set and unique across the
/// whole platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub subdomain: String,
    pub company_name: String,
    pub product_id: String,
    pub deployment_id: String,
    pub plan: String,
    pub status: TenantStatus,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_port: u16,
    pub project_path: Option<String>,
    pub repo_url: Option<String>,
    pub owner: String,
    pub is_deployed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "serialize_optional_datetime")]
    pub deployed_at: Option<DateTime<Utc>>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(serialize_with = "serialize_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Connection URL for this tenant's logical database.
    pub fn database_url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }

    /// Public URL for this workspace.
    pub fn url(&self, base_domain: &str) -> String {
        format!("https://{}.{}", self.subdomain, base_domain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Suspend,
    Activate,
    Deploy,
    Redeploy,
}

/// Append-only audit entry. Written by every state-changing operation;
/// never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    pub tenant_id: Option<String>,
    pub deployment_id: Option<String>,
    pub user: Option<String>,
    pub action: ActivityAction,
    pub description: String,
    pub ip_address: Option<String>,

    #[serde(serialize_with = "serialize_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub display_name: String,
    pub backend_image: Option<String>,
    pub frontend_image: Option<String>,
    pub template_path: Option<String>,
    pub supports_shared: bool,
    pub supports_dedicated: bool,
}

#[derive(Debug, Clone)]
pub struct NewDeployment {
    pub name: String,
    pub product_id: String,
    pub deployment_type: DeploymentType,
    pub max_tenants: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub subdomain: String,
    pub company_name: String,
    pub product_id: String,
    pub deployment_id: String,
    pub plan: String,
    pub owner: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_host: String,
    pub db_port: u16,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub tenant_id: Option<String>,
    pub deployment_id: Option<String>,
    pub user: Option<String>,
    pub action: ActivityAction,
    pub description: String,
    pub ip_address: Option<String>,
}

// Serialize DateTime as RFC 3339 / ISO 8601 string
pub(crate) fn serialize_datetime<S>(
    dt: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&dt.to_rfc3339())
}

pub(crate) fn serialize_optional_datetime<S>(
    dt: &Option<DateTime<Utc>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match dt {
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
        None => serializer.serialize_none(),
    }
}
