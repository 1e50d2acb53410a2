//! The Tenant Store: the authoritative record of tenants, products, and
//! deployments.
//!
//! Every other control-plane crate reads and writes tenant state through
//! this crate. Nothing caches tenant rows across requests; the store is the
//! single source of truth and all access goes through ordinary transactional
//! statements.

pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod test_utils;

pub use error::{Result, StoreError};
pub use models::{
    ActivityAction, ActivityLog, Deployment, DeploymentStatus, DeploymentType, NewActivity,
    NewDeployment, NewProduct, NewTenant, Product, Tenant, TenantStatus,
};
pub use store::TenantStore;
