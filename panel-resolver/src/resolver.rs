use crate::context::{RequestContext, TenantContext};
use panel_core::validate_subdomain;
use panel_store::{Result, TenantStore};
use tracing::{debug, instrument};

/// Hosts that always resolve to the administrative surface.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Suffix under which workspaces live, e.g. "example.com" serves
    /// workspaces at "<subdomain>.example.com".
    pub base_domain: String,
    /// The panel's own host, e.g. "panel.example.com".
    pub panel_host: String,
}

/// Resolves Host headers to tenants.
#[derive(Clone)]
pub struct TenantResolver {
    store: TenantStore,
    config: ResolverConfig,
}

impl TenantResolver {
    pub fn new(store: TenantStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Resolve a raw Host header value.
    ///
    /// Returns `Err` only on store failure; every malformed or unknown
    /// host resolves to `Admin` or `NoTenant`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, host: &str) -> Result<RequestContext> {
        let host = strip_port(host).to_ascii_lowercase();

        if host == self.config.panel_host
            || host == self.config.base_domain
            || LOOPBACK_HOSTS.contains(&host.as_str())
        {
            return Ok(RequestContext::Admin);
        }

        let subdomain = match extract_subdomain(&host, &self.config.base_domain) {
            Some(subdomain) => subdomain,
            None => {
                debug!(host, "Host does not map to a workspace subdomain");
                return Ok(RequestContext::NoTenant { subdomain: None });
            }
        };

        match self.store.find_active_tenant(&subdomain).await? {
            Some(tenant) => Ok(RequestContext::Tenant(TenantContext::new(tenant))),
            None => Ok(RequestContext::NoTenant {
                subdomain: Some(subdomain),
            }),
        }
    }
}

/// Pull the workspace subdomain out of a host under the base domain.
///
/// Only a single leading label is a valid tenant key; deeper nesting and
/// hosts outside the base domain yield `None`.
pub fn extract_subdomain(host: &str, base_domain: &str) -> Option<String> {
    let prefix = host.strip_suffix(base_domain)?.strip_suffix('.')?;

    if prefix.is_empty() || prefix.contains('.') {
        return None;
    }

    validate_subdomain(prefix).ok()?;

    Some(prefix.to_string())
}

/// Drop a trailing port from a Host header value. Handles bracketed IPv6
/// literals; a bare IPv6 address (multiple colons, no brackets) is left
/// untouched.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return &rest[..end];
        }
    }

    if host.matches(':').count() == 1 {
        if let Some((name, _port)) = host.split_once(':') {
            return name;
        }
    }

    host
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain_basic() {
        assert_eq!(
            extract_subdomain("acme.example.com", "example.com"),
            Some("acme".to_string())
        );
        assert_eq!(
            extract_subdomain("acme-corp.example.com", "example.com"),
            Some("acme-corp".to_string())
        );
    }

    #[test]
    fn test_extract_subdomain_rejects_nested_labels() {
        assert_eq!(extract_subdomain("a.b.example.com", "example.com"), None);
    }

    #[test]
    fn test_extract_subdomain_rejects_foreign_hosts() {
        assert_eq!(extract_subdomain("example.com", "example.com"), None);
        assert_eq!(extract_subdomain("evil.org", "example.com"), None);
        // Suffix match must respect the label boundary.
        assert_eq!(extract_subdomain("notexample.com", "example.com"), None);
    }

    #[test]
    fn test_extract_subdomain_rejects_invalid_labels() {
        assert_eq!(extract_subdomain("-bad.example.com", "example.com"), None);
        assert_eq!(extract_subdomain("UPPER.example.com", "example.com"), None);
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("acme.example.com:8080"), "acme.example.com");
        assert_eq!(strip_port("acme.example.com"), "acme.example.com");
        assert_eq!(strip_port("127.0.0.1:443"), "127.0.0.1");
        assert_eq!(strip_port("[::1]:8080"), "::1");
        assert_eq!(strip_port("::1"), "::1");
    }
}
