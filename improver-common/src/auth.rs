//! Request authentication helpers
//!
//! Identity is delegated to the upstream identity provider: by the time a
//! request reaches an Improver service the gateway has already validated the
//! session and the `Authorization` header carries the opaque user id as a
//! bearer token. This module contains only the pure header-parsing pieces;
//! framework-specific extractors live in each service.

/// Extract the bearer token from an `Authorization` header value.
///
/// Returns `None` for a missing header, a non-Bearer scheme, or an empty
/// token. The scheme comparison is case-insensitive per RFC 7235.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
