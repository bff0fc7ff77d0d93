//! Session token endpoints.
//!
//! - POST `/login` - Exchange email + password for an access/refresh pair
//! - POST `/refresh` - Rotate a refresh token into a new pair
//! - POST `/logout` - Revoke a refresh token

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;

use super::error::{ApiError, ResultExt};
use crate::session::{SessionManager, TokenPair};

pub fn login_router(state: SessionManager) -> Router {
    Router::new().route("/login", post(login)).with_state(state)
}

pub fn router(state: SessionManager) -> Router {
    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

async fn login(
    State(sessions): State<SessionManager>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let Json(payload) = payload?;

    let pair = sessions
        .login(&payload.email, &payload.password)
        .await
        .api_err("invalid credentials")?;
    Ok(Json(pair))
}

async fn refresh(
    State(sessions): State<SessionManager>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let Json(payload) = payload?;

    let pair = sessions
        .refresh(&payload.refresh_token)
        .await
        .api_err("refresh token expired or invalid")?;
    Ok(Json(pair))
}

async fn logout(
    State(sessions): State<SessionManager>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    sessions
        .logout(&payload.refresh_token)
        .await
        .api_err("not authorized")?;
    Ok(StatusCode::NO_CONTENT)
}
