//! Foundation types shared by the panel control plane.
//!
//! This crate carries the pieces every other panel crate needs: the common
//! error type, identifier/subdomain validation, and credential generation.
//! It deliberately has no database or HTTP dependencies.

pub mod error;
pub mod secrets;
pub mod validation;

pub use error::{CoreError, Result};
pub use secrets::{generate_password, generate_secret_key};
pub use validation::{sanitize_subdomain, validate_identifier, validate_subdomain};
