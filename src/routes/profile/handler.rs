use axum::extract::{Extension, Json, State};

use super::model::{Profile, UpdateProfileRequest};
use crate::{
    AppState, common::ApiResponse, error::AppError, middleware::AuthUser,
    utils::success_to_api_response,
};

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = Profile::find_by_id(&state.pool, user.id)
        .await?
        .ok_or(AppError::NotFound("profile"))?;
    Ok(success_to_api_response(profile))
}

#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    req.validate().map_err(AppError::Validation)?;
    let profile = Profile::upsert(&state.pool, user.id, req).await?;
    Ok(success_to_api_response(profile))
}
