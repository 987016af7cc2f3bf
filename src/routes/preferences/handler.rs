use axum::extract::{Extension, Json, State};
use serde_json::Value;

use super::model::UserPreferences;
use crate::{
    AppState, common::ApiResponse, error::AppError, middleware::AuthUser,
    utils::success_to_api_response,
};

#[axum::debug_handler]
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<UserPreferences>>, AppError> {
    let preferences = UserPreferences::get(&state.pool, user.id).await?;
    Ok(success_to_api_response(preferences))
}

#[axum::debug_handler]
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<UserPreferences>>, AppError> {
    let Value::Object(patch) = patch else {
        return Err(AppError::Validation("preferences must be a JSON object".into()));
    };
    let preferences = UserPreferences::update(&state.pool, user.id, patch).await?;
    Ok(success_to_api_response(preferences))
}
