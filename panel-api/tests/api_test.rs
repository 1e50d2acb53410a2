//! HTTP-level tests with instrumented doubles behind the orchestrator.

use async_trait::async_trait;
use axum_test::TestServer;
use panel_api::signature::sign;
use panel_api::{app, AppState};
use panel_orchestrator::{
    ContainerRuntime, DeploymentOrchestrator, OrchestratorConfig, Provisioner, RestartOutcome,
    SourceControl,
};
use panel_resolver::{ResolverConfig, TenantResolver};
use panel_store::test_utils::create_test_db;
use panel_store::NewProduct;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const SECRET: &str = "webhook-secret";

#[derive(Default)]
struct StubProvisioner;

#[async_trait]
impl Provisioner for StubProvisioner {
    async fn ensure_database(
        &self,
        _db_name: &str,
        _db_user: &str,
        _db_password: &str,
    ) -> panel_provisioner::Result<()> {
        Ok(())
    }

    async fn drop_database(&self, _db_name: &str, _db_user: &str) -> panel_provisioner::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct StubRuntime {
    up_count: AtomicUsize,
    restart_count: AtomicUsize,
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn compose_up(&self, _dir: &Path) -> panel_orchestrator::Result<String> {
        self.up_count.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }

    async fn restart_unit(&self, _unit: &str) -> panel_orchestrator::Result<RestartOutcome> {
        self.restart_count.fetch_add(1, Ordering::SeqCst);
        Ok(RestartOutcome::Restarted)
    }
}

#[derive(Default)]
struct StubVcs {
    pull_count: AtomicUsize,
}

#[async_trait]
impl SourceControl for StubVcs {
    async fn pull(&self, _dir: &Path) -> panel_orchestrator::Result<String> {
        self.pull_count.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

struct Harness {
    server: TestServer,
    runtime: Arc<StubRuntime>,
    vcs: Arc<StubVcs>,
    _template_dir: TempDir,
    _root_dir: TempDir,
}

async fn harness() -> Harness {
    let store = create_test_db().await;

    let template_dir = TempDir::new().unwrap();
    std::fs::write(
        template_dir.path().join("docker-compose.yml"),
        "services:\n  app:\n    environment:\n      DB: ${DB_NAME}\n",
    )
    .unwrap();

    store
        .create_product(NewProduct {
            name: "erp".to_string(),
            display_name: "ERP Suite".to_string(),
            backend_image: None,
            frontend_image: None,
            template_path: Some(template_dir.path().display().to_string()),
            supports_shared: true,
            supports_dedicated: true,
        })
        .await
        .unwrap();

    let root_dir = TempDir::new().unwrap();
    let runtime = Arc::new(StubRuntime::default());
    let vcs = Arc::new(StubVcs::default());

    let orchestrator = Arc::new(DeploymentOrchestrator::new(
        store.clone(),
        Arc::new(StubProvisioner),
        runtime.clone(),
        vcs.clone(),
        OrchestratorConfig {
            base_domain: "example.com".to_string(),
            deployments_root: root_dir.path().to_path_buf(),
            db_host: "postgres".to_string(),
            db_port: 5432,
            shared_max_tenants: 10,
        },
    ));

    let resolver = TenantResolver::new(
        store.clone(),
        ResolverConfig {
            base_domain: "example.com".to_string(),
            panel_host: "panel.example.com".to_string(),
        },
    );

    let state = AppState {
        store,
        resolver,
        orchestrator,
        webhook_secret: SECRET.to_string(),
    };

    Harness {
        server: TestServer::new(app(state)).unwrap(),
        runtime,
        vcs,
        _template_dir: template_dir,
        _root_dir: root_dir,
    }
}

async fn provision(server: &TestServer, subdomain: &str) -> Value {
    let response = server
        .post("/api/v1/workspaces")
        .json(&json!({
            "product": "erp",
            "subdomain": subdomain,
            "company_name": "Acme Corp",
            "type": "shared",
            "owner": "admin@acme.test",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()
}

#[tokio::test]
async fn test_health() {
    let h = harness().await;
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_provision_workspace_and_resolve_it() {
    let h = harness().await;

    let body = provision(&h.server, "acme").await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["url"], json!("https://acme.example.com"));
    assert_eq!(body["db_name"], json!("tenant_acme"));

    let workspace = h.server.get("/api/v1/workspaces/acme").await;
    workspace.assert_status_ok();
    assert_eq!(workspace.json::<Value>()["is_deployed"], json!(true));

    let resolved = h
        .server
        .get("/api/v1/resolve")
        .add_header("host", "acme.example.com")
        .await;
    resolved.assert_status_ok();
    let resolved = resolved.json::<Value>();
    assert_eq!(resolved["context"], json!("tenant"));
    assert_eq!(resolved["subdomain"], json!("acme"));
    assert!(resolved["database_url"]
        .as_str()
        .unwrap()
        .ends_with("/tenant_acme"));
}

#[tokio::test]
async fn test_resolve_admin_and_unknown_hosts() {
    let h = harness().await;

    let admin = h
        .server
        .get("/api/v1/resolve")
        .add_header("host", "panel.example.com")
        .await;
    assert_eq!(admin.json::<Value>()["context"], json!("admin"));

    let unknown = h
        .server
        .get("/api/v1/resolve")
        .add_header("host", "ghost.example.com")
        .await;
    let unknown = unknown.json::<Value>();
    assert_eq!(unknown["context"], json!("none"));
    assert_eq!(unknown["subdomain"], json!("ghost"));
}

#[tokio::test]
async fn test_duplicate_subdomain_is_409() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    let response = h
        .server
        .post("/api/v1/workspaces")
        .json(&json!({
            "product": "erp",
            "subdomain": "acme",
            "company_name": "Other Corp",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["success"], json!(false));
}

#[tokio::test]
async fn test_invalid_subdomain_is_400() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/v1/workspaces")
        .json(&json!({
            "product": "erp",
            "subdomain": "Not.Valid",
            "company_name": "Acme Corp",
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_valid_signature_triggers_one_redeploy() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    let body = r#"{"ref":"refs/heads/main"}"#;
    let response = h
        .server
        .post("/api/v1/webhooks/push/erp")
        .add_header("x-hub-signature-256", sign(SECRET, body.as_bytes()))
        .bytes(body.as_bytes().to_vec().into())
        .await;

    response.assert_status_ok();
    let json_body = response.json::<Value>();
    assert_eq!(json_body["success"], json!(true));
    assert_eq!(json_body["triggered"], json!(true));
    assert_eq!(h.vcs.pull_count.load(Ordering::SeqCst), 1);
    assert_eq!(h.runtime.restart_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_webhook_tampered_body_is_403() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    let signature = sign(SECRET, br#"{"ref":"refs/heads/main"}"#);
    // One byte differs from the signed body.
    let tampered = r#"{"ref":"refs/heads/maiN"}"#;
    let response = h
        .server
        .post("/api/v1/webhooks/push/erp")
        .add_header("x-hub-signature-256", signature)
        .bytes(tampered.as_bytes().to_vec().into())
        .await;

    response.assert_status(axum::http::StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>(),
        json!({ "success": false, "error": "invalid signature" })
    );
    assert_eq!(h.vcs.pull_count.load(Ordering::SeqCst), 0);
    assert_eq!(h.runtime.restart_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_webhook_missing_signature_is_403() {
    let h = harness().await;

    let response = h
        .server
        .post("/api/v1/webhooks/push/erp")
        .bytes(br#"{"ref":"refs/heads/main"}"#.to_vec().into())
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_webhook_feature_branch_is_acknowledged_noop() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    let body = r#"{"ref":"refs/heads/feature/x"}"#;
    let response = h
        .server
        .post("/api/v1/webhooks/push/erp")
        .add_header("x-hub-signature-256", sign(SECRET, body.as_bytes()))
        .bytes(body.as_bytes().to_vec().into())
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["triggered"], json!(false));
    assert_eq!(h.vcs.pull_count.load(Ordering::SeqCst), 0);
    assert_eq!(h.runtime.restart_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_suspend_blocks_resolution_until_activate() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    h.server
        .post("/api/v1/workspaces/acme/suspend")
        .await
        .assert_status_ok();
    let resolved = h
        .server
        .get("/api/v1/resolve")
        .add_header("host", "acme.example.com")
        .await;
    assert_eq!(resolved.json::<Value>()["context"], json!("none"));

    h.server
        .post("/api/v1/workspaces/acme/activate")
        .await
        .assert_status_ok();
    let resolved = h
        .server
        .get("/api/v1/resolve")
        .add_header("host", "acme.example.com")
        .await;
    assert_eq!(resolved.json::<Value>()["context"], json!("tenant"));
}

#[tokio::test]
async fn test_mark_inactive_stops_resolution_but_keeps_workspace() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    let response = h.server.post("/api/v1/workspaces/acme/mark-inactive").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], json!("inactive"));

    let resolved = h
        .server
        .get("/api/v1/resolve")
        .add_header("host", "acme.example.com")
        .await;
    assert_eq!(resolved.json::<Value>()["context"], json!("none"));

    // The workspace record survives for later reactivation.
    h.server
        .get("/api/v1/workspaces/acme")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_decommission_removes_workspace() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    h.server
        .delete("/api/v1/workspaces/acme")
        .await
        .assert_status_ok();
    h.server
        .get("/api/v1/workspaces/acme")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_activity_endpoint_lists_entries() {
    let h = harness().await;
    provision(&h.server, "acme").await;

    let response = h.server.get("/api/v1/activity").await;
    response.assert_status_ok();
    let entries = response.json::<Value>();
    assert!(!entries.as_array().unwrap().is_empty());
}
