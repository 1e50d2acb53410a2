use panel_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] panel_core::CoreError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provisioning failed: {0}")]
    Provision(#[from] panel_provisioner::ProvisionerError),

    #[error("Deployment template missing: {0}")]
    TemplateMissing(String),

    #[error("Project path missing for {0}; deploy before redeploying")]
    ProjectMissing(String),

    #[error("Container runtime failed for {unit}: {detail}")]
    Runtime { unit: String, detail: String },

    #[error("Source pull failed in {path} (exit code {code:?}): {detail}")]
    PullFailed {
        path: String,
        code: Option<i32>,
        detail: String,
    },

    #[error("{operation} timed out after {seconds} seconds")]
    Timeout { operation: String, seconds: u64 },

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Not-found and uniqueness conflicts from the store keep their meaning at
// this layer instead of collapsing into a generic database error.
impl From<StoreError> for OrchestratorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => OrchestratorError::NotFound(what),
            StoreError::Conflict(what) => OrchestratorError::Conflict(what),
            other => OrchestratorError::Store(other),
        }
    }
}
