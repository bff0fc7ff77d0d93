//! Bearer credential parsing.

use axum::http::{HeaderMap, header};

use super::errors::AuthErrorKind;

/// Extract the token from an `Authorization: Bearer <token>` header.
/// The scheme is case-insensitive; surrounding whitespace on the token is ignored.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthErrorKind> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthErrorKind::MissingCredential)?
        .to_str()
        .map_err(|_| AuthErrorKind::MalformedHeader)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthErrorKind::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthErrorKind::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthErrorKind::MalformedHeader);
    }
    Ok(token)
}
