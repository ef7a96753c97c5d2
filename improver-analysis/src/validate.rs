//! Request validation rules
//!
//! URL acceptance runs before admission, so a rejected URL never touches the
//! ledger or the job store.

use url::Url;

use crate::error::ApiError;

/// Validate a target URL for analysis.
///
/// The URL must parse as absolute, use http or https, and must not point at
/// localhost or the blocked private-network prefixes. The prefix list is
/// deliberately coarse (`172.` blocks more than RFC 1918 and there is no
/// IPv6 handling); it matches the behavior clients already depend on.
pub fn validate_analysis_url(raw: &str) -> Result<Url, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::Validation("URL is required".to_string()));
    }

    let parsed = Url::parse(raw)
        .map_err(|_| ApiError::Validation("Please enter a valid URL".to_string()))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ApiError::Validation(
            "URL must use HTTP or HTTPS protocol".to_string(),
        ));
    }

    let hostname = parsed
        .host_str()
        .ok_or_else(|| ApiError::Validation("Please enter a valid URL".to_string()))?
        .to_lowercase();

    if hostname == "localhost"
        || hostname == "127.0.0.1"
        || hostname.starts_with("192.168.")
        || hostname.starts_with("10.")
        || hostname.starts_with("172.")
    {
        return Err(ApiError::Validation(
            "Cannot analyze local or private network URLs".to_string(),
        ));
    }

    Ok(parsed)
}

/// Clamp bounds for the accessibility-check timeout (milliseconds)
pub const URL_CHECK_TIMEOUT_MIN_MS: u64 = 1000;
pub const URL_CHECK_TIMEOUT_MAX_MS: u64 = 30000;
pub const URL_CHECK_TIMEOUT_DEFAULT_MS: u64 = 10000;

/// Validate the accessibility-check timeout, rejecting out-of-range values
pub fn validate_check_timeout(timeout_ms: Option<u64>) -> Result<u64, ApiError> {
    match timeout_ms {
        None => Ok(URL_CHECK_TIMEOUT_DEFAULT_MS),
        Some(t) if (URL_CHECK_TIMEOUT_MIN_MS..=URL_CHECK_TIMEOUT_MAX_MS).contains(&t) => Ok(t),
        Some(t) => Err(ApiError::Validation(format!(
            "Timeout must be between {} and {} milliseconds, got {}",
            URL_CHECK_TIMEOUT_MIN_MS, URL_CHECK_TIMEOUT_MAX_MS, t
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn accepts_public_http_and_https_urls() {
        assert!(validate_analysis_url("https://example.com").is_ok());
        assert!(validate_analysis_url("http://example.com/page?x=1").is_ok());
    }

    #[test]
    fn rejects_relative_and_garbage_input() {
        let err = message(validate_analysis_url("not a url").unwrap_err());
        assert!(err.contains("Please enter a valid URL"));

        let err = message(validate_analysis_url("/relative/path").unwrap_err());
        assert!(err.contains("Please enter a valid URL"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        let err = message(validate_analysis_url("ftp://example.com").unwrap_err());
        assert!(err.contains("URL must use HTTP or HTTPS protocol"));
    }

    #[test]
    fn rejects_local_and_private_hosts() {
        for url in [
            "http://localhost",
            "http://localhost:3000/admin",
            "http://127.0.0.1",
            "http://192.168.1.1",
            "http://10.0.0.5/internal",
            "http://172.16.0.1",
        ] {
            let err = message(validate_analysis_url(url).unwrap_err());
            assert!(
                err.contains("Cannot analyze local or private network URLs"),
                "wrong message for {}",
                url
            );
        }
    }

    #[test]
    fn blocklist_is_prefix_based_and_coarse() {
        // 172.32.x.x is public address space but still blocked by the
        // documented prefix rule
        assert!(validate_analysis_url("http://172.32.0.1").is_err());
    }

    #[test]
    fn hostname_check_is_case_insensitive() {
        assert!(validate_analysis_url("http://LOCALHOST").is_err());
    }

    #[test]
    fn timeout_defaults_and_bounds() {
        assert_eq!(validate_check_timeout(None).unwrap(), 10000);
        assert_eq!(validate_check_timeout(Some(1000)).unwrap(), 1000);
        assert_eq!(validate_check_timeout(Some(30000)).unwrap(), 30000);
        assert!(validate_check_timeout(Some(999)).is_err());
        assert!(validate_check_timeout(Some(30001)).is_err());
    }
}
