use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        claims::Claims,
        dto::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse,
            RegisterRequest, RegisterResponse, ResetPasswordRequest,
        },
        extractors::AuthUser,
        services::{self, is_valid_email},
    },
    error::AppError,
    extract::ValidJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile))
}

fn require_email(email: &str) -> Result<(), AppError> {
    if !is_valid_email(email) {
        warn!(email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let email = payload.email.trim();
    require_email(email)?;
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let res = services::register(&state, email, &payload.password, name).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = payload.email.trim();
    Ok(Json(services::login(&state, email, &payload.password).await?))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    Ok(Json(services::forgot_password(&state, payload.email.trim()).await?))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.new_pass.is_empty() {
        return Err(AppError::Validation("New password is required".into()));
    }
    Ok(Json(
        services::reset_password(&state, payload.token.trim(), &payload.new_pass).await?,
    ))
}

#[instrument(skip_all, fields(user_id = %claims.sub))]
pub async fn profile(AuthUser(claims): AuthUser) -> Json<Claims> {
    Json(claims)
}
