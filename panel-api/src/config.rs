use panel_provisioner::AdminConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_base_domain")]
    pub base_domain: String,

    #[serde(default = "default_panel_host")]
    pub panel_host: String,

    #[serde(default = "default_deployments_root")]
    pub deployments_root: PathBuf,

    /// Host and port tenant applications use to reach Postgres.
    #[serde(default = "default_tenant_db_host")]
    pub tenant_db_host: String,

    #[serde(default = "default_tenant_db_port")]
    pub tenant_db_port: u16,

    #[serde(default = "default_admin_db_host")]
    pub admin_db_host: String,

    #[serde(default = "default_admin_db_port")]
    pub admin_db_port: u16,

    #[serde(default = "default_admin_db_user")]
    pub admin_db_user: String,

    #[serde(default = "default_admin_db_password")]
    pub admin_db_password: String,

    /// Shared HMAC secret for push webhooks.
    #[serde(default = "default_webhook_secret")]
    pub webhook_secret: String,

    #[serde(default = "default_shared_max_tenants")]
    pub shared_max_tenants: i64,

    /// Bound on every external process invocation (compose, git).
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    std::env::var("PANEL_BIND").unwrap_or_else(|_| "0.0.0.0:8100".to_string())
}

fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("PANEL_DB_PATH") {
        return PathBuf::from(path);
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".panel").join("panel.db")
}

fn default_base_domain() -> String {
    std::env::var("PANEL_BASE_DOMAIN").unwrap_or_else(|_| "localhost".to_string())
}

fn default_panel_host() -> String {
    std::env::var("PANEL_HOST")
        .unwrap_or_else(|_| format!("panel.{}", default_base_domain()))
}

fn default_deployments_root() -> PathBuf {
    std::env::var("PANEL_DEPLOYMENTS_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/srv/deployments"))
}

fn default_tenant_db_host() -> String {
    std::env::var("PANEL_TENANT_DB_HOST").unwrap_or_else(|_| "postgres".to_string())
}

fn default_tenant_db_port() -> u16 {
    std::env::var("PANEL_TENANT_DB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5432)
}

fn default_admin_db_host() -> String {
    std::env::var("PANEL_ADMIN_DB_HOST").unwrap_or_else(|_| "localhost".to_string())
}

fn default_admin_db_port() -> u16 {
    std::env::var("PANEL_ADMIN_DB_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5432)
}

fn default_admin_db_user() -> String {
    std::env::var("PANEL_ADMIN_DB_USER").unwrap_or_else(|_| "postgres".to_string())
}

fn default_admin_db_password() -> String {
    std::env::var("PANEL_ADMIN_DB_PASSWORD").unwrap_or_default()
}

fn default_webhook_secret() -> String {
    std::env::var("PANEL_WEBHOOK_SECRET").unwrap_or_default()
}

fn default_shared_max_tenants() -> i64 {
    std::env::var("PANEL_SHARED_MAX_TENANTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50)
}

fn default_command_timeout() -> u64 {
    std::env::var("PANEL_COMMAND_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300) // 5 minutes
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            base_domain: default_base_domain(),
            panel_host: default_panel_host(),
            deployments_root: default_deployments_root(),
            tenant_db_host: default_tenant_db_host(),
            tenant_db_port: default_tenant_db_port(),
            admin_db_host: default_admin_db_host(),
            admin_db_port: default_admin_db_port(),
            admin_db_user: default_admin_db_user(),
            admin_db_password: default_admin_db_password(),
            webhook_secret: default_webhook_secret(),
            shared_max_tenants: default_shared_max_tenants(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn admin_config(&self) -> AdminConfig {
        AdminConfig {
            host: self.admin_db_host.clone(),
            port: self.admin_db_port,
            user: self.admin_db_user.clone(),
            password: self.admin_db_password.clone(),
            maintenance_db: "postgres".to_string(),
            connect_timeout_secs: 10,
        }
    }
}
