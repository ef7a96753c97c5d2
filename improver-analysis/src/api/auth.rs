//! Authenticated-user extractor
//!
//! The identity provider validates sessions upstream at the gateway; what
//! reaches this service is the opaque user id as a bearer token. A missing
//! or malformed header rejects with 401 before the handler runs.

use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};

use crate::error::ApiError;

/// The authenticated caller's opaque user id
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match improver_common::auth::bearer_token(header) {
            Some(token) => Ok(AuthUser(token.to_string())),
            None => Err(ApiError::Unauthorized),
        }
    }
}
