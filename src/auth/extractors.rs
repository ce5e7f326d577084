use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys};
use crate::{error::AppError, state::AppState};

/// Header carrying the administrative token for maintenance routes.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Extracts and validates the bearer JWT, yielding its claims.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify(token.trim()).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(AuthUser(claims))
    }
}

/// Grants access to maintenance routes. Requires `ADMIN_TOKEN` to be configured
/// and presented verbatim in the `X-Admin-Token` header.
pub struct AdminAccess;

#[async_trait]
impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.admin_token.as_deref() else {
            warn!("admin route called but ADMIN_TOKEN is not configured");
            return Err(AppError::Forbidden("Administrative operations are disabled".into()));
        };

        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok());

        match presented {
            Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => {
                Ok(AdminAccess)
            }
            _ => {
                warn!("admin token missing or mismatched");
                Err(AppError::Forbidden("Admin token required".into()))
            }
        }
    }
}
