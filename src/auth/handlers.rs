use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, RegisterResponse,
            TokensResponse,
        },
        extractors::{bearer_token, AuthUser},
        validate::is_valid_email,
    },
    error::ApiError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let registration = payload.into_registration().map_err(|e| {
        warn!(error = %e, "registration rejected by validation");
        e
    })?;
    let registered = state.sessions.register(registration).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse::from(registered))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<TokensResponse>, ApiError> {
    let email = payload.email.trim();
    if !is_valid_email(email) {
        warn!("login with malformed email");
        return Err(ApiError::bad_request("Invalid email"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password is required"));
    }

    let session = state.sessions.login(email, &payload.password).await?;
    Ok(Json(TokensResponse::from(session)))
}

/// Accepts the refresh token as `{"refresh_token": ...}` or as a bearer credential.
#[instrument(skip(state, headers, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Option<ApiJson<RefreshRequest>>,
) -> Result<Json<TokensResponse>, ApiError> {
    let raw = payload
        .map(|ApiJson(body)| body.refresh_token)
        .or_else(|| bearer_token(&headers).map(str::to_owned))
        .ok_or_else(|| ApiError::unauthorized("Missing refresh token"))?;

    let claims = state.keys.verify_refresh(&raw).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::from(e)
    })?;

    let session = state.sessions.refresh(&raw, &claims).await?;
    Ok(Json(TokensResponse::from(session)))
}

#[instrument(skip(state, claims), fields(user_id = claims.id))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.logout(claims.id).await?;
    Ok(Json(MessageResponse {
        message: "Successfully logged out and session revoked.",
    }))
}
