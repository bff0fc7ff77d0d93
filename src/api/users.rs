//! Account endpoints.
//!
//! - POST `/signup` - Create an account (no tokens issued)
//! - GET `/me` - Profile of the bearer (behind the auth gate)

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::session::{Profile, SessionManager};

pub fn signup_router(state: SessionManager) -> Router {
    Router::new()
        .route("/signup", post(sign_up))
        .with_state(state)
}

pub fn me_router(state: SessionManager) -> Router {
    Router::new().route("/me", get(me)).with_state(state)
}

#[derive(Deserialize)]
struct SignUpRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn sign_up(
    State(sessions): State<SessionManager>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    sessions
        .sign_up(&payload.email, &payload.password)
        .await
        .api_err("invalid credentials")?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "user created",
        }),
    ))
}

async fn me(
    State(sessions): State<SessionManager>,
    Auth(user): Auth,
) -> Result<Json<Profile>, ApiError> {
    let profile = sessions.me(user.user_id).await.api_err("not authorized")?;
    Ok(Json(profile))
}
