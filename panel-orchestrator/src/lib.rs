//! Deployment orchestration: placement, artifact rendering, and container
//! runtime driving.
//!
//! The orchestrator owns the deployment state machine
//! (`deploying -> active | error`, `active -> error | stopped`,
//! `error -> deploying` on retry) and serializes all filesystem and
//! container operations per deployment name. Placement follows the
//! shared-vs-dedicated decision: shared tenants land on an existing unit
//! with spare capacity when one exists, everything else gets a freshly
//! rendered unit.

pub mod error;
pub mod locks;
pub mod orchestrator;
pub mod runtime;
pub mod template;
pub mod vcs;

pub use error::{OrchestratorError, Result};
pub use locks::DeploymentLocks;
pub use orchestrator::{
    DeploymentOrchestrator, OrchestratorConfig, ProvisionOutcome, ProvisionRequest, Provisioner,
    RedeployOutcome, RestartReport,
};
pub use runtime::{ComposeRuntime, ContainerRuntime, RestartOutcome};
pub use template::{render_template, TemplateVars};
pub use vcs::{GitCli, SourceControl};
