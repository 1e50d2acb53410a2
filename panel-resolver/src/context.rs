use panel_store::Tenant;
use sqlx::postgres::PgConnectOptions;

/// What a request resolved to. Data access for the request must be bound
/// to this before any tenant-database statement is issued.
#[derive(Debug, Clone)]
pub enum RequestContext {
    /// The panel's own domain or a loopback host: administrative surface,
    /// default database.
    Admin,

    /// A host under the base domain with no matching active tenant. The
    /// downstream handler renders a 404 or "suspended" page.
    NoTenant { subdomain: Option<String> },

    /// An active tenant owns the request.
    Tenant(TenantContext),
}

impl RequestContext {
    pub fn tenant(&self) -> Option<&Tenant> {
        match self {
            RequestContext::Tenant(ctx) => Some(&ctx.tenant),
            _ => None,
        }
    }
}

/// A resolved tenant plus the connection parameters downstream data access
/// must use.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub tenant: Tenant,
}

impl TenantContext {
    pub fn new(tenant: Tenant) -> Self {
        Self { tenant }
    }

    /// Connection options for the tenant's logical database.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.tenant.db_host)
            .port(self.tenant.db_port)
            .username(&self.tenant.db_user)
            .password(&self.tenant.db_password)
            .database(&self.tenant.db_name)
    }

    pub fn database_url(&self) -> String {
        self.tenant.database_url()
    }
}
