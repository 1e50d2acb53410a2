//! Centralized validation for tenant-supplied names.
//!
//! Database and role names are interpolated into administrative DDL, and
//! subdomains become routing keys. Both ultimately derive from user input,
//! so every caller validates here before touching SQL or the filesystem.

use crate::error::{CoreError, Result};

/// Validate an identifier destined for administrative SQL (database or role
/// name). Only lowercase letters, digits, and underscores are allowed, and
/// the first character must not be a digit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 63 {
        return Err(CoreError::Validation(
            "Identifier must be between 1 and 63 characters".to_string(),
        ));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or('0');
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(CoreError::Validation(format!(
            "Identifier '{}' must start with a lowercase letter or underscore",
            name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(CoreError::Validation(format!(
            "Identifier '{}' contains invalid characters (only lowercase letters, digits, and '_' allowed)",
            name
        )));
    }

    Ok(())
}

/// Validate a workspace subdomain: a single DNS label, lowercase
/// alphanumeric plus hyphens, no leading or trailing hyphen.
pub fn validate_subdomain(subdomain: &str) -> Result<()> {
    if subdomain.is_empty() || subdomain.len() > 63 {
        return Err(CoreError::Validation(
            "Subdomain must be between 1 and 63 characters".to_string(),
        ));
    }

    if subdomain.contains('.') {
        return Err(CoreError::Validation(
            "Subdomain must be a single label (no dots)".to_string(),
        ));
    }

    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(CoreError::Validation(
            "Subdomain cannot start or end with a hyphen".to_string(),
        ));
    }

    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(format!(
            "Subdomain '{}' contains invalid characters (only lowercase alphanumerics and '-' allowed)",
            subdomain
        )));
    }

    Ok(())
}

/// Map a subdomain to the form used in database object names. Hyphens are
/// legal in DNS labels but not in unquoted SQL identifiers.
pub fn sanitize_subdomain(subdomain: &str) -> String {
    subdomain.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_valid() {
        assert!(validate_identifier("tenant_acme").is_ok());
        assert!(validate_identifier("user_acme_corp").is_ok());
        assert!(validate_identifier("_internal").is_ok());
    }

    #[test]
    fn test_validate_identifier_invalid() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1tenant").is_err());
        assert!(validate_identifier("Tenant").is_err());
        assert!(validate_identifier("tenant-acme").is_err());

        // Injection attempts
        assert!(validate_identifier("x; DROP DATABASE postgres").is_err());
        assert!(validate_identifier("x'--").is_err());
        assert!(validate_identifier("x\nmalicious").is_err());
    }

    #[test]
    fn test_validate_subdomain_valid() {
        assert!(validate_subdomain("acme").is_ok());
        assert!(validate_subdomain("acme-corp").is_ok());
        assert!(validate_subdomain("a1").is_ok());
    }

    #[test]
    fn test_validate_subdomain_invalid() {
        assert!(validate_subdomain("").is_err());
        assert!(validate_subdomain("Acme").is_err());
        assert!(validate_subdomain("-acme").is_err());
        assert!(validate_subdomain("acme-").is_err());
        assert!(validate_subdomain("acme.corp").is_err());
        assert!(validate_subdomain("acme corp").is_err());
        assert!(validate_subdomain(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_sanitize_subdomain() {
        assert_eq!(sanitize_subdomain("acme-corp"), "acme_corp");
        assert_eq!(sanitize_subdomain("acme"), "acme");
    }
}
