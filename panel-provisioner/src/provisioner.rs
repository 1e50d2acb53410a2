//! Administrative DDL against the Postgres cluster.
//!
//! Postgres cannot bind parameters in DDL, so database and role names are
//! interpolated after strict identifier validation, and passwords are
//! escaped as string literals. Everything else uses bound parameters.

use crate::error::{ProvisionerError, Result};
use async_trait::async_trait;
use panel_core::validate_identifier;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Parameters for the privileged administrative connection. Process-wide
/// configuration, never per-tenant.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Maintenance database to connect to for DDL ("postgres" by default).
    pub maintenance_db: String,
    pub connect_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            maintenance_db: "postgres".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// The administrative statements provisioning needs, as a seam over the
/// live connection.
#[async_trait]
pub(crate) trait AdminSession: Send {
    async fn role_exists(&mut self, role: &str) -> Result<bool>;
    async fn database_exists(&mut self, database: &str) -> Result<bool>;
    async fn execute(&mut self, statement: &str) -> Result<()>;
    /// Kill active sessions against a database; returns how many.
    async fn terminate_sessions(&mut self, database: &str) -> Result<usize>;
}

#[async_trait]
impl AdminSession for PgConnection {
    async fn role_exists(&mut self, role: &str) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM pg_roles WHERE rolname = $1")
            .bind(role)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row.is_some())
    }

    async fn database_exists(&mut self, database: &str) -> Result<bool> {
        let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(database)
            .fetch_optional(&mut *self)
            .await?;
        Ok(row.is_some())
    }

    async fn execute(&mut self, statement: &str) -> Result<()> {
        sqlx::query(statement).execute(&mut *self).await?;
        Ok(())
    }

    async fn terminate_sessions(&mut self, database: &str) -> Result<usize> {
        let terminated: Vec<(bool,)> = sqlx::query_as(
            r#"
            SELECT pg_terminate_backend(pid)
            FROM pg_stat_activity
            WHERE datname = $1 AND pid <> pg_backend_pid()
            "#,
        )
        .bind(database)
        .fetch_all(&mut *self)
        .await?;
        Ok(terminated.len())
    }
}

/// Creates and drops tenant database/role pairs.
#[derive(Debug, Clone)]
pub struct DatabaseProvisioner {
    config: AdminConfig,
}

impl DatabaseProvisioner {
    pub fn new(config: AdminConfig) -> Self {
        Self { config }
    }

    async fn connect(&self) -> Result<PgConnection> {
        let options = PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.maintenance_db);

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(err)) => Err(ProvisionerError::Connection(err)),
            Err(_) => Err(ProvisionerError::Timeout(self.config.connect_timeout_secs)),
        }
    }

    /// Ensure the tenant's role and database exist.
    ///
    /// Safe to call again after a partial failure: existing objects are
    /// left alone and only the missing steps run.
    #[instrument(skip(self, db_password))]
    pub async fn ensure_database(
        &self,
        db_name: &str,
        db_user: &str,
        db_password: &str,
    ) -> Result<()> {
        validate_identifier(db_name)?;
        validate_identifier(db_user)?;

        let mut conn = self.connect().await?;
        ensure_with(&mut conn, db_name, db_user, db_password).await
    }

    /// Drop the tenant's database and role. Irreversible; callers confirm
    /// deletion intent before reaching here.
    #[instrument(skip(self))]
    pub async fn drop_database(&self, db_name: &str, db_user: &str) -> Result<()> {
        validate_identifier(db_name)?;
        validate_identifier(db_user)?;

        let mut conn = self.connect().await?;
        drop_with(&mut conn, db_name, db_user).await
    }
}

async fn ensure_with<S: AdminSession>(
    session: &mut S,
    db_name: &str,
    db_user: &str,
    db_password: &str,
) -> Result<()> {
    if !session.role_exists(db_user).await? {
        session
            .execute(&format!(
                r#"CREATE ROLE "{}" LOGIN PASSWORD {}"#,
                db_user,
                quote_literal(db_password)
            ))
            .await?;
        info!(role = db_user, "Created tenant role");
    }

    if !session.database_exists(db_name).await? {
        session
            .execute(&format!(
                r#"CREATE DATABASE "{}" OWNER "{}""#,
                db_name, db_user
            ))
            .await?;
        info!(database = db_name, owner = db_user, "Created tenant database");
    }

    session
        .execute(&format!(
            r#"GRANT ALL PRIVILEGES ON DATABASE "{}" TO "{}""#,
            db_name, db_user
        ))
        .await
        .map_err(|err| match err {
            ProvisionerError::Sql(source) => ProvisionerError::Privilege {
                db: db_name.to_string(),
                role: db_user.to_string(),
                source,
            },
            other => other,
        })?;

    Ok(())
}

async fn drop_with<S: AdminSession>(session: &mut S, db_name: &str, db_user: &str) -> Result<()> {
    // Active sessions block DROP DATABASE.
    let terminated = session.terminate_sessions(db_name).await?;
    if terminated > 0 {
        warn!(
            database = db_name,
            sessions = terminated,
            "Terminated active sessions before drop"
        );
    }

    session
        .execute(&format!(r#"DROP DATABASE IF EXISTS "{}""#, db_name))
        .await?;
    session
        .execute(&format!(r#"DROP ROLE IF EXISTS "{}""#, db_user))
        .await?;

    info!(database = db_name, role = db_user, "Dropped tenant database and role");

    Ok(())
}

/// Quote a string as a SQL literal. Doubling single quotes is the only
/// escape needed under standard_conforming_strings.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Tracks cluster state so repeated calls see their own effects.
    #[derive(Default)]
    struct FakeSession {
        roles: HashSet<String>,
        databases: HashSet<String>,
        statements: Vec<String>,
        fail_grants: bool,
    }

    #[async_trait]
    impl AdminSession for FakeSession {
        async fn role_exists(&mut self, role: &str) -> Result<bool> {
            Ok(self.roles.contains(role))
        }

        async fn database_exists(&mut self, database: &str) -> Result<bool> {
            Ok(self.databases.contains(database))
        }

        async fn execute(&mut self, statement: &str) -> Result<()> {
            if statement.starts_with("GRANT") && self.fail_grants {
                return Err(ProvisionerError::Sql(sqlx::Error::PoolClosed));
            }
            if let Some(rest) = statement.strip_prefix("CREATE ROLE \"") {
                let name = rest.split('"').next().unwrap_or_default();
                self.roles.insert(name.to_string());
            }
            if let Some(rest) = statement.strip_prefix("CREATE DATABASE \"") {
                let name = rest.split('"').next().unwrap_or_default();
                self.databases.insert(name.to_string());
            }
            self.statements.push(statement.to_string());
            Ok(())
        }

        async fn terminate_sessions(&mut self, _database: &str) -> Result<usize> {
            Ok(0)
        }
    }

    fn unreachable_provisioner() -> DatabaseProvisioner {
        DatabaseProvisioner::new(AdminConfig {
            host: "192.0.2.1".to_string(),
            connect_timeout_secs: 1,
            ..AdminConfig::default()
        })
    }

    #[test]
    fn test_quote_literal_plain() {
        assert_eq!(quote_literal("s3cret"), "'s3cret'");
    }

    #[test]
    fn test_quote_literal_escapes_quotes() {
        assert_eq!(quote_literal("pa'ss"), "'pa''ss'");
        assert_eq!(quote_literal("'; DROP DATABASE x; --"), "'''; DROP DATABASE x; --'");
    }

    #[tokio::test]
    async fn test_ensure_creates_role_database_and_grant() {
        let mut session = FakeSession::default();

        ensure_with(&mut session, "tenant_acme", "user_acme", "pw")
            .await
            .unwrap();

        assert_eq!(session.statements.len(), 3);
        assert!(session.statements[0].starts_with("CREATE ROLE \"user_acme\""));
        assert!(session.statements[1].starts_with("CREATE DATABASE \"tenant_acme\""));
        assert!(session.statements[2].starts_with("GRANT ALL PRIVILEGES"));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let mut session = FakeSession::default();

        ensure_with(&mut session, "tenant_acme", "user_acme", "pw")
            .await
            .unwrap();
        let after_first = session.statements.len();

        // Second invocation with identical arguments must not error and
        // must not recreate anything.
        ensure_with(&mut session, "tenant_acme", "user_acme", "pw")
            .await
            .unwrap();

        let second_run = &session.statements[after_first..];
        assert_eq!(second_run.len(), 1);
        assert!(second_run[0].starts_with("GRANT ALL PRIVILEGES"));
    }

    #[tokio::test]
    async fn test_ensure_completes_partial_state() {
        let mut session = FakeSession::default();
        // Role survived a prior run that died before CREATE DATABASE.
        session.roles.insert("user_acme".to_string());

        ensure_with(&mut session, "tenant_acme", "user_acme", "pw")
            .await
            .unwrap();

        assert!(session
            .statements
            .iter()
            .all(|s| !s.starts_with("CREATE ROLE")));
        assert!(session
            .statements
            .iter()
            .any(|s| s.starts_with("CREATE DATABASE \"tenant_acme\"")));
    }

    #[tokio::test]
    async fn test_grant_failure_maps_to_privilege_error() {
        let mut session = FakeSession {
            fail_grants: true,
            ..FakeSession::default()
        };

        let result = ensure_with(&mut session, "tenant_acme", "user_acme", "pw").await;
        match result {
            Err(ProvisionerError::Privilege { db, role, .. }) => {
                assert_eq!(db, "tenant_acme");
                assert_eq!(role, "user_acme");
            }
            other => panic!("expected privilege error, got {:?}", other),
        }
        // The database was still created; the caller retries the grant only.
        assert!(session.databases.contains("tenant_acme"));
    }

    #[tokio::test]
    async fn test_drop_removes_database_then_role() {
        let mut session = FakeSession::default();
        session.roles.insert("user_acme".to_string());
        session.databases.insert("tenant_acme".to_string());

        drop_with(&mut session, "tenant_acme", "user_acme")
            .await
            .unwrap();

        assert_eq!(session.statements.len(), 2);
        assert!(session.statements[0].starts_with("DROP DATABASE IF EXISTS \"tenant_acme\""));
        assert!(session.statements[1].starts_with("DROP ROLE IF EXISTS \"user_acme\""));
    }

    #[tokio::test]
    async fn test_ensure_rejects_bad_identifiers_before_connecting() {
        let provisioner = unreachable_provisioner();

        let result = provisioner
            .ensure_database("tenant; DROP DATABASE postgres", "user_x", "pw")
            .await;
        assert!(matches!(
            result,
            Err(ProvisionerError::InvalidIdentifier(_))
        ));

        let result = provisioner
            .ensure_database("tenant_x", "user-x", "pw")
            .await;
        assert!(matches!(
            result,
            Err(ProvisionerError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn test_drop_rejects_bad_identifiers_before_connecting() {
        let provisioner = unreachable_provisioner();

        let result = provisioner.drop_database("tenant_x\"--", "user_x").await;
        assert!(matches!(
            result,
            Err(ProvisionerError::InvalidIdentifier(_))
        ));
    }
}
