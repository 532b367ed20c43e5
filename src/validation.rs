//! Input validation and SSRF protection for subscriber registrations and
//! inbound receiver parameters.

use std::net::IpAddr;

use crate::error::HookError;
use crate::models::WILDCARD_FILTER;

/// Allowed length range for subscriber signing secrets.
pub const SECRET_MIN_LEN: usize = 32;
pub const SECRET_MAX_LEN: usize = 64;

/// Allowed length range for the inbound `code` query parameter.
pub const CODE_MIN_LEN: usize = 32;
pub const CODE_MAX_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Callback URL validation
// ---------------------------------------------------------------------------

/// Validate a subscriber callback URL.
///
/// Checks:
/// 1. URL is parseable and absolute
/// 2. Scheme is HTTPS (or HTTP if `allow_http` is true for dev/test)
/// 3. Host is not a private/internal address (SSRF protection)
///
/// `allow_http` also lifts the internal-host restriction so local targets
/// can be registered in development.
pub fn validate_callback_url(url: &str, allow_http: bool) -> Result<(), HookError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| HookError::InvalidUrl(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(HookError::InvalidUrl(
                "Callback URLs must use HTTPS".to_string(),
            ));
        }
        scheme => {
            return Err(HookError::InvalidUrl(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| HookError::InvalidUrl("URL must have a host".to_string()))?;

    if !allow_http {
        validate_host_not_internal(host)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate that a host is not a private/internal address.
///
/// Blocks loopback, private networks, link-local (cloud metadata endpoints),
/// CGNAT, IPv6 loopback/unspecified, and internal hostnames.
pub fn validate_host_not_internal(host: &str) -> Result<(), HookError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(HookError::SsrfDetected(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost"
        || lower == "metadata.google.internal"
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(HookError::SsrfDetected(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

/// Check if an IP address belongs to a private/internal range.
fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()                // 127.0.0.0/8
                || v4.is_private()          // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                || v4.is_link_local()       // 169.254.0.0/16
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10 (CGNAT)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Secret / filter / code validation
// ---------------------------------------------------------------------------

/// Validate a subscriber signing secret (32-64 characters).
pub fn validate_secret(secret: &str) -> Result<(), HookError> {
    let len = secret.chars().count();
    if !(SECRET_MIN_LEN..=SECRET_MAX_LEN).contains(&len) {
        return Err(HookError::Validation(format!(
            "Secret must be {SECRET_MIN_LEN}-{SECRET_MAX_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate an endpoint filter set: non-empty, no empty action names.
pub fn validate_filters(filters: &[String]) -> Result<(), HookError> {
    if filters.is_empty() {
        return Err(HookError::Validation(
            "Endpoint must have at least one filter".to_string(),
        ));
    }
    for f in filters {
        if f.is_empty() {
            return Err(HookError::Validation(
                "Filter action names must be non-empty".to_string(),
            ));
        }
        if f != WILDCARD_FILTER && f.contains('*') {
            return Err(HookError::Validation(format!(
                "Filter '{f}' may not contain a partial wildcard"
            )));
        }
    }
    Ok(())
}

/// Validate the inbound `code` query parameter (32-128 characters).
pub fn validate_code(code: &str) -> Result<(), HookError> {
    let len = code.chars().count();
    if !(CODE_MIN_LEN..=CODE_MAX_LEN).contains(&len) {
        return Err(HookError::Validation(format!(
            "The 'code' query parameter must be {CODE_MIN_LEN}-{CODE_MAX_LEN} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- URL validation ---

    #[test]
    fn test_valid_https_url() {
        assert!(validate_callback_url("https://example.com/hooks", false).is_ok());
    }

    #[test]
    fn test_valid_https_url_with_port() {
        assert!(validate_callback_url("https://hooks.example.com:8443/cb", false).is_ok());
    }

    #[test]
    fn test_http_url_rejected_by_default() {
        let result = validate_callback_url("http://example.com/hooks", false);
        assert!(matches!(result, Err(HookError::InvalidUrl(_))));
    }

    #[test]
    fn test_http_url_allowed_in_dev() {
        assert!(validate_callback_url("http://example.com/hooks", true).is_ok());
    }

    #[test]
    fn test_dev_mode_allows_local_targets() {
        assert!(validate_callback_url("http://127.0.0.1:8080/hooks", true).is_ok());
        assert!(validate_callback_url("https://127.0.0.1:8080/hooks", false).is_err());
    }

    #[test]
    fn test_relative_url_rejected() {
        assert!(validate_callback_url("/hooks/incoming", false).is_err());
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(validate_callback_url("ftp://example.com/hooks", false).is_err());
    }

    // --- SSRF protection ---

    #[test]
    fn test_ssrf_blocks_loopback() {
        assert!(validate_host_not_internal("127.0.0.1").is_err());
    }

    #[test]
    fn test_ssrf_blocks_private_ranges() {
        assert!(validate_host_not_internal("10.0.0.1").is_err());
        assert!(validate_host_not_internal("172.16.0.1").is_err());
        assert!(validate_host_not_internal("192.168.0.1").is_err());
    }

    #[test]
    fn test_ssrf_blocks_metadata_endpoint() {
        assert!(validate_host_not_internal("169.254.169.254").is_err());
        assert!(validate_host_not_internal("metadata.google.internal").is_err());
    }

    #[test]
    fn test_ssrf_blocks_cgnat() {
        assert!(validate_host_not_internal("100.64.0.1").is_err());
    }

    #[test]
    fn test_ssrf_blocks_internal_hostnames() {
        assert!(validate_host_not_internal("localhost").is_err());
        assert!(validate_host_not_internal("service.internal").is_err());
        assert!(validate_host_not_internal("myhost.local").is_err());
    }

    #[test]
    fn test_ssrf_allows_public_hosts() {
        assert!(validate_host_not_internal("8.8.8.8").is_ok());
        assert!(validate_host_not_internal("hooks.example.com").is_ok());
    }

    // --- Secret validation ---

    #[test]
    fn test_secret_length_bounds() {
        assert!(validate_secret(&"a".repeat(31)).is_err());
        assert!(validate_secret(&"a".repeat(32)).is_ok());
        assert!(validate_secret(&"a".repeat(64)).is_ok());
        assert!(validate_secret(&"a".repeat(65)).is_err());
    }

    // --- Filter validation ---

    #[test]
    fn test_filters_must_be_non_empty() {
        assert!(validate_filters(&[]).is_err());
    }

    #[test]
    fn test_filters_reject_empty_action() {
        assert!(validate_filters(&[String::new()]).is_err());
    }

    #[test]
    fn test_filters_accept_wildcard_and_actions() {
        assert!(validate_filters(&["*".to_string()]).is_ok());
        assert!(validate_filters(&["user.created".to_string()]).is_ok());
    }

    #[test]
    fn test_filters_reject_partial_wildcard() {
        assert!(validate_filters(&["user.*".to_string()]).is_err());
    }

    // --- Code validation ---

    #[test]
    fn test_code_length_bounds() {
        assert!(validate_code(&"c".repeat(31)).is_err());
        assert!(validate_code(&"c".repeat(32)).is_ok());
        assert!(validate_code(&"c".repeat(128)).is_ok());
        assert!(validate_code(&"c".repeat(129)).is_err());
    }
}
