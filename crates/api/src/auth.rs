//! Identity claim extraction.
//!
//! Authentication itself is out of scope: an upstream gateway terminates
//! credentials and injects the verified claim as `x-auth-identity` and
//! `x-auth-role` headers. This service trusts those headers and only applies
//! authorization rules to them.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::{AuthClaim, Role};

use crate::error::ApiError;

pub const IDENTITY_HEADER: &str = "x-auth-identity";
pub const ROLE_HEADER: &str = "x-auth-role";

/// Extractor wrapping the request's [`AuthClaim`].
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthClaim);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = header_str(parts, IDENTITY_HEADER)?
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let role = match header_str(parts, ROLE_HEADER)? {
            Some(raw) => Role::parse(raw).ok_or_else(|| {
                ApiError::Unauthorized(format!("Unknown role in auth claim: {raw}"))
            })?,
            None => Role::Customer,
        };

        Ok(Authenticated(AuthClaim::new(identity, role)))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| ApiError::Unauthorized(format!("Malformed {name} header"))),
    }
}

/// Rejects non-administrator claims.
pub fn require_admin(claim: &AuthClaim) -> Result<(), ApiError> {
    if claim.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Engine(engine::EngineError::Forbidden))
    }
}
