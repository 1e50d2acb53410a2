use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionerError>;

#[derive(Error, Debug)]
pub enum ProvisionerError {
    /// The administrative connection could not be established. Fatal;
    /// no partial state was created.
    #[error("Failed to connect to administrative database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Administrative statement failed: {0}")]
    Sql(#[from] sqlx::Error),

    /// The grant step failed after role and database creation. The
    /// database exists; the caller should retry the grant, not recreate.
    #[error("Failed to grant privileges on {db} to {role}: {source}")]
    Privilege {
        db: String,
        role: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    InvalidIdentifier(#[from] panel_core::CoreError),

    #[error("Administrative operation timed out after {0} seconds")]
    Timeout(u64),
}
