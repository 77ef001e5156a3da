use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{auth::extractors::AuthUser, error::ApiError, extract::ApiJson, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Decimal,
}

pub fn savings_routes() -> Router<AppState> {
    Router::new()
        .route("/savings/deposit", post(deposit))
        .route("/savings/withdraw", post(withdraw))
        .route("/savings/balance", get(balance))
}

#[instrument(skip(state, claims, payload), fields(user_id = claims.id))]
pub async fn deposit(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(payload): ApiJson<AmountRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.savings.deposit(claims.id, payload.amount).await?;
    Ok(Json(BalanceResponse { balance }))
}

#[instrument(skip(state, claims, payload), fields(user_id = claims.id))]
pub async fn withdraw(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(payload): ApiJson<AmountRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.savings.withdraw(claims.id, payload.amount).await?;
    Ok(Json(BalanceResponse { balance }))
}

#[instrument(skip(state, claims), fields(user_id = claims.id))]
pub async fn balance(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.savings.balance(claims.id).await?;
    Ok(Json(BalanceResponse { balance }))
}
