use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, error::ApiError, state::AppState};

/// Authenticated requester identity, resolved once per request and passed
/// explicitly into handlers.
///
/// Verifies the bearer token, then confirms the subject still exists, so
/// closing an account invalidates every outstanding session token.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired session token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)"#,
        )
        .bind(claims.sub)
        .fetch_one(&state.db)
        .await?;

        if !exists {
            warn!(user_id = %claims.sub, "session token for deleted account");
            return Err(ApiError::unauthorized("Invalid or expired token"));
        }

        Ok(AuthUser(claims.sub))
    }
}
