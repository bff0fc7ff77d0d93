mod error;
mod tokens;
mod users;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::auth::require_auth;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};
use crate::session::SessionManager;

pub use error::{ApiError, ResultExt};

/// Create the API router.
///
/// `/signup`, `/login`, `/refresh` and `/logout` are public; `/me` sits
/// behind the bearer-token gate.
pub fn create_api_router(
    sessions: SessionManager,
    rate_limit: Option<Arc<RateLimitConfig>>,
) -> Router {
    let mut signup = users::signup_router(sessions.clone());
    let mut login = tokens::login_router(sessions.clone());

    if let Some(config) = rate_limit {
        signup = signup.layer(middleware::from_fn_with_state(
            config.clone(),
            rate_limit_signup,
        ));
        login = login.layer(middleware::from_fn_with_state(config, rate_limit_login));
    }

    let protected = users::me_router(sessions.clone()).route_layer(
        middleware::from_fn_with_state(sessions.jwt().clone(), require_auth),
    );

    Router::new()
        .merge(signup)
        .merge(login)
        .merge(tokens::router(sessions))
        .merge(protected)
}
