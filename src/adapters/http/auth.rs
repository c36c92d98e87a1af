//! Caller identity for the owner-scoped endpoints, and the shared token
//! the workflow runner presents.

use super::error::ApiError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Header the identity gateway sets to the internal user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, taken from the `x-user-id` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing user identity".into()))?;

        let user_id = Uuid::parse_str(value.trim())
            .map_err(|_| ApiError::Unauthorized("Invalid user identity".into()))?;

        Ok(AuthUser { user_id })
    }
}

/// Bearer token of the workflow runner. Only its SHA-256 digest is kept, and
/// presented tokens are compared digest to digest in constant time.
#[derive(Clone)]
pub struct RunnerToken {
    digest: [u8; 32],
}

impl RunnerToken {
    /// `None` for a blank token, which would authorize nothing.
    pub fn new(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            return None;
        }
        Some(Self {
            digest: Sha256::digest(token.as_bytes()).into(),
        })
    }

    pub fn matches(&self, presented: &str) -> bool {
        let digest: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        digest
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Checks the `Authorization: Bearer <token>` header.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Missing workflow token".into()))?;
        if self.matches(presented.trim()) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("Invalid workflow token".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_blank_runner_token_is_refused() {
        assert!(RunnerToken::new("").is_none());
        assert!(RunnerToken::new("   ").is_none());
    }

    #[test]
    fn test_runner_token_matches_only_itself() {
        let token = RunnerToken::new("runner-secret").unwrap();

        assert!(token.matches("runner-secret"));
        assert!(!token.matches("runner-secreT"));
        assert!(!token.matches("runner-secret-and-more"));
        assert!(!token.matches(""));
    }

    #[test]
    fn test_authorize_reads_bearer_header() {
        let token = RunnerToken::new("runner-secret").unwrap();

        assert!(token.authorize(&bearer("Bearer runner-secret")).is_ok());
        assert!(matches!(
            token.authorize(&bearer("Bearer nope")),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            token.authorize(&bearer("runner-secret")),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            token.authorize(&HeaderMap::new()),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
