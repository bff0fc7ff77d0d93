//! The authentication gate and the extractor that reads its result.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::bearer::bearer_token;
use super::errors::{AuthErrorKind, AuthRejection};
use super::types::AuthenticatedUser;
use crate::jwt::{JwtConfig, JwtError};

/// Resolve the caller from the bearer access token.
pub fn authenticate(headers: &HeaderMap, jwt: &JwtConfig) -> Result<AuthenticatedUser, AuthErrorKind> {
    let token = bearer_token(headers)?;

    let claims = jwt.validate_access_token(token).map_err(|e| match e {
        JwtError::Expired => AuthErrorKind::ExpiredToken,
        _ => AuthErrorKind::InvalidToken,
    })?;

    Ok(AuthenticatedUser {
        user_id: claims.user_id,
        claims,
    })
}

/// Middleware guarding protected routes.
///
/// On success the resolved [`AuthenticatedUser`] is stored in the request
/// extensions for [`Auth`]; on failure the wrapped handler never runs.
pub async fn require_auth(
    State(jwt): State<Arc<JwtConfig>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let user = authenticate(request.headers(), &jwt).map_err(|kind| {
        debug!(reason = ?kind, path = %request.uri().path(), "Request rejected by auth gate");
        AuthRejection::new(kind)
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the identity attached by [`require_auth`].
/// Rejects with 401 if the route is not behind the gate.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(Auth)
            .ok_or_else(|| AuthRejection::new(AuthErrorKind::NotAuthenticated))
    }
}
