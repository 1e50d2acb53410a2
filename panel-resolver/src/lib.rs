//! Request-time tenant resolution.
//!
//! Maps an inbound Host header to either the administrative surface, a
//! specific tenant's database context, or "no tenant". Resolution is
//! read-only and performs at most one store lookup per request. Unknown
//! or malformed hosts resolve to no tenant rather than erroring; the
//! downstream handler decides how to present that.

pub mod context;
pub mod resolver;

pub use context::{RequestContext, TenantContext};
pub use resolver::{extract_subdomain, ResolverConfig, TenantResolver};
