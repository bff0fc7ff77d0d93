#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tollgate::{
    ServerConfig, create_app,
    db::Database,
    jwt::{JwtConfig, parse_ttl},
    rate_limit::RateLimitConfig,
    session::DEFAULT_STORE_TIMEOUT,
};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";
pub const PASSWORD: &str = "pa55word";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// Builder for test servers. Defaults: in-memory database, 15m/168h lifetimes,
/// no rate limiting.
pub struct TestAppBuilder {
    database: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    rate_limit: Option<RateLimitConfig>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            database: ":memory:".to_string(),
            access_ttl: parse_ttl("15m").unwrap(),
            refresh_ttl: parse_ttl("168h").unwrap(),
            rate_limit: None,
        }
    }

    pub fn database(mut self, path: &str) -> Self {
        self.database = path.to_string();
        self
    }

    pub fn access_ttl(mut self, ttl: &str) -> Self {
        self.access_ttl = parse_ttl(ttl).unwrap();
        self
    }

    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(&self.database)
            .await
            .expect("Failed to open test database");
        let jwt = JwtConfig::new(
            ACCESS_SECRET,
            self.access_ttl,
            REFRESH_SECRET,
            self.refresh_ttl,
        )
        .expect("Failed to build JWT config");
        let config = ServerConfig {
            db: db.clone(),
            jwt: jwt.clone(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
            rate_limit: self.rate_limit.map(Arc::new),
        };
        TestApp {
            app: create_app(&config),
            db,
            jwt,
        }
    }
}

pub async fn create_test_app() -> TestApp {
    TestAppBuilder::new().build().await
}

/// Send a request and return the status and the raw body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_with_auth(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

/// POST JSON and parse the JSON response.
pub async fn call(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, bytes) = send(app, post_json(uri, body)).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn signup(app: &Router, email: &str, password: &str) -> StatusCode {
    let (status, _) = call(
        app,
        "/signup",
        json!({ "email": email, "password": password }),
    )
    .await;
    status
}

/// Sign up and log in, returning the login response body.
pub async fn signup_and_login(app: &Router, email: &str) -> Value {
    assert_eq!(signup(app, email, PASSWORD).await, StatusCode::CREATED);
    let (status, body) = call(
        app,
        "/login",
        json!({ "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

pub async fn me(app: &Router, access_token: &str) -> (StatusCode, Vec<u8>) {
    send(
        app,
        get_with_auth("/me", Some(&format!("Bearer {}", access_token))),
    )
    .await
}
