use axum::{extract::State, routing::get, Json, Router};
use tracing::{instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    state::AppState,
    users::dto::ProfileResponse,
};

pub fn users_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile))
}

#[instrument(skip(state, claims), fields(user_id = claims.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state.users.find_by_id(claims.id).await?.ok_or_else(|| {
        warn!("profile requested for missing user");
        ApiError::not_found(format!("User with ID {} not found.", claims.id))
    })?;
    Ok(Json(ProfileResponse::from(&user)))
}
