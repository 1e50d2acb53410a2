//! Source control boundary for the redeploy path.

use crate::error::{OrchestratorError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::instrument;

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Pull the latest source into an existing checkout. Returns captured
    /// output for diagnostics.
    async fn pull(&self, dir: &Path) -> Result<String>;
}

/// Pulls through the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl GitCli {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(300)
    }
}

#[async_trait]
impl SourceControl for GitCli {
    #[instrument(skip(self))]
    async fn pull(&self, dir: &Path) -> Result<String> {
        let mut command = Command::new("git");
        command
            .arg("-C")
            .arg(dir)
            .args(["pull", "--ff-only"])
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| OrchestratorError::Timeout {
                operation: "git pull".to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(OrchestratorError::PullFailed {
                path: dir.display().to_string(),
                code: output.status.code(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
