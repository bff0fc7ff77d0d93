//! Authentication error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Why a request failed the gate. Only used for logging; every kind
/// produces the same response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingCredential,
    MalformedHeader,
    InvalidToken,
    ExpiredToken,
    /// Handler asked for a user on a route the gate does not guard
    NotAuthenticated,
}

/// Gate rejection: a bare 401 with no body.
#[derive(Debug)]
pub struct AuthRejection {
    pub(super) kind: AuthErrorKind,
}

impl AuthRejection {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }
}

impl From<AuthErrorKind> for AuthRejection {
    fn from(kind: AuthErrorKind) -> Self {
        Self::new(kind)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        StatusCode::UNAUTHORIZED.into_response()
    }
}
