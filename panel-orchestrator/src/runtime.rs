//! Container runtime boundary.
//!
//! The orchestrator needs exactly three verbs with distinguishable
//! outcomes: bring up a rendered descriptor, restart a named unit, and
//! tell "unit not found" apart from other restart failures. The default
//! implementation shells out to `docker`, with a bounded timeout on every
//! invocation.

use crate::error::{OrchestratorError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted,
    /// The named unit does not exist. Not an error: a brand-new shared
    /// tenant may not have a running unit yet.
    NotFound,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Bring up the services described by the compose descriptor in `dir`.
    /// Returns captured output for diagnostics.
    async fn compose_up(&self, dir: &Path) -> Result<String>;

    /// Restart a named running unit.
    async fn restart_unit(&self, unit: &str) -> Result<RestartOutcome>;
}

/// Drives Docker Compose through the `docker` CLI.
#[derive(Debug, Clone)]
pub struct ComposeRuntime {
    timeout: Duration,
}

impl ComposeRuntime {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    async fn run(&self, operation: &str, command: &mut Command) -> Result<std::process::Output> {
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| OrchestratorError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        Ok(output)
    }
}

impl Default for ComposeRuntime {
    fn default() -> Self {
        // Image pulls on first deploy can be slow.
        Self::new(300)
    }
}

#[async_trait]
impl ContainerRuntime for ComposeRuntime {
    #[instrument(skip(self))]
    async fn compose_up(&self, dir: &Path) -> Result<String> {
        let mut command = Command::new("docker");
        command
            .args(["compose", "up", "-d", "--remove-orphans"])
            .current_dir(dir)
            .kill_on_drop(true);

        let output = self.run("docker compose up", &mut command).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(OrchestratorError::Runtime {
                unit: dir.display().to_string(),
                detail: stderr.trim().to_string(),
            });
        }

        debug!(dir = %dir.display(), "Compose services up");
        Ok(stderr.into_owned())
    }

    #[instrument(skip(self))]
    async fn restart_unit(&self, unit: &str) -> Result<RestartOutcome> {
        let mut command = Command::new("docker");
        command.args(["restart", unit]).kill_on_drop(true);

        let output = self.run("docker restart", &mut command).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            return Ok(RestartOutcome::Restarted);
        }

        if stderr.contains("No such container") {
            return Ok(RestartOutcome::NotFound);
        }

        Err(OrchestratorError::Runtime {
            unit: unit.to_string(),
            detail: stderr.trim().to_string(),
        })
    }
}
