//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::{ClientIpHeader, extract_client_ip};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::new(1).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const SIGNUP_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Rate limiting configuration for credential endpoints.
pub struct RateLimitConfig {
    /// Login: bursts of 5 per IP, refilling one per second
    pub login: IpLimiter,
    /// Signup: 3 requests per minute per IP
    pub signup: IpLimiter,
    /// Where to read the client IP from (socket address when `None`)
    pub ip_header: Option<ClientIpHeader>,
}

impl RateLimitConfig {
    pub fn new(ip_header: Option<ClientIpHeader>) -> Self {
        Self::with_quotas(
            Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            Quota::per_minute(SIGNUP_PER_MIN),
            ip_header,
        )
    }

    pub fn with_quotas(login: Quota, signup: Quota, ip_header: Option<ClientIpHeader>) -> Self {
        Self {
            login: RateLimiter::keyed(login),
            signup: RateLimiter::keyed(signup),
            ip_header,
        }
    }
}

async fn check(
    limiter: &IpLimiter,
    ip_header: Option<ClientIpHeader>,
    message: &'static str,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, ip_header) {
        Ok(ip) => ip,
        Err(reason) => {
            warn!(reason, "Unable to determine client IP for rate limiting");
            return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
        }
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            (StatusCode::TOO_MANY_REQUESTS, message).into_response()
        }
    }
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.login,
        config.ip_header,
        "Too many login attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

/// Middleware for rate limiting signup.
pub async fn rate_limit_signup(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.signup,
        config.ip_header,
        "Too many signup attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}
