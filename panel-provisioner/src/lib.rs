//! Postgres database provisioning for tenants.
//!
//! Each tenant owns one logical database and one role. This crate creates
//! and drops those pairs through a privileged administrative connection.
//! All operations are idempotent so a failed provisioning run can be
//! retried without manual cleanup.

pub mod error;
pub mod provisioner;

pub use error::{ProvisionerError, Result};
pub use provisioner::{AdminConfig, DatabaseProvisioner};
