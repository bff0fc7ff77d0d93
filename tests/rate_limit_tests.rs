//! Tests for per-IP rate limiting of credential endpoints.

mod common;

use axum::http::StatusCode;
use common::{PASSWORD, TestAppBuilder, post_json, send};
use governor::Quota;
use serde_json::json;
use std::num::NonZeroU32;
use tollgate::auth::ClientIpHeader;
use tollgate::rate_limit::RateLimitConfig;

fn one_per_hour() -> Quota {
    Quota::per_hour(NonZeroU32::new(1).unwrap())
}

fn from_ip(uri: &str, body: serde_json::Value, ip: &str) -> axum::http::Request<axum::body::Body> {
    let mut request = post_json(uri, body);
    request
        .headers_mut()
        .insert("x-forwarded-for", ip.parse().unwrap());
    request
}

#[tokio::test]
async fn test_login_limited_per_ip() {
    let t = TestAppBuilder::new()
        .rate_limit(RateLimitConfig::with_quotas(
            one_per_hour(),
            one_per_hour(),
            Some(ClientIpHeader::XForwardedFor),
        ))
        .build()
        .await;
    let body = json!({ "email": "peggy@example.com", "password": PASSWORD });

    let (status, _) = send(&t.app, from_ip("/login", body.clone(), "10.0.0.1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, from_ip("/login", body.clone(), "10.0.0.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Another address has its own bucket
    let (status, _) = send(&t.app, from_ip("/login", body, "10.0.0.2")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_limited_per_ip() {
    let t = TestAppBuilder::new()
        .rate_limit(RateLimitConfig::with_quotas(
            one_per_hour(),
            one_per_hour(),
            Some(ClientIpHeader::XForwardedFor),
        ))
        .build()
        .await;

    let (status, _) = send(
        &t.app,
        from_ip(
            "/signup",
            json!({ "email": "rupert@example.com", "password": PASSWORD }),
            "10.0.0.1",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &t.app,
        from_ip(
            "/signup",
            json!({ "email": "sybil@example.com", "password": PASSWORD }),
            "10.0.0.1",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Refresh and logout are never limited
    for _ in 0..3 {
        let (status, _) = send(
            &t.app,
            from_ip("/logout", json!({ "refresh_token": "x" }), "10.0.0.1"),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}

#[tokio::test]
async fn test_unknown_client_ip_is_forbidden() {
    let t = TestAppBuilder::new()
        .rate_limit(RateLimitConfig::with_quotas(
            one_per_hour(),
            one_per_hour(),
            Some(ClientIpHeader::XForwardedFor),
        ))
        .build()
        .await;

    let (status, _) = send(
        &t.app,
        post_json(
            "/login",
            json!({ "email": "trent@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
