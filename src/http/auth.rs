//! Bearer token extractor

use axum::{extract::FromRequestParts, http::{header::AUTHORIZATION, request::Parts}};

use super::{ApiError, AppState};
use crate::domain::aggregates::User;
use crate::EcommerceError;

/// The authenticated caller. Rejects with 403 `permission denied` when the
/// `Authorization: Bearer` token is missing or does not resolve to a live session.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(EcommerceError::Unauthorized)?;

        match state.auth.authenticate(token).await {
            Ok(user) => Ok(Self(user)),
            Err(err @ EcommerceError::Storage(_)) => Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %err, "rejected bearer token");
                Err(EcommerceError::Unauthorized.into())
            }
        }
    }
}
