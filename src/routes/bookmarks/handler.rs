use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use serde_json::json;
use uuid::Uuid;

use super::model::{Bookmark, CreateBookmarkRequest};
use crate::{
    AppState, common::ApiResponse, error::AppError, middleware::AuthUser,
    utils::success_to_api_response,
};

#[axum::debug_handler]
pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<Bookmark>>>, AppError> {
    let bookmarks = Bookmark::list(&state.pool, user.id).await?;
    Ok(success_to_api_response(bookmarks))
}

#[axum::debug_handler]
pub async fn add_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Bookmark>>), AppError> {
    req.validate().map_err(AppError::Validation)?;
    let bookmark = Bookmark::add(&state.pool, user.id, req).await?;
    Ok((StatusCode::CREATED, success_to_api_response(bookmark)))
}

#[axum::debug_handler]
pub async fn remove_bookmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(bookmark_id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    if !Bookmark::remove(&state.pool, user.id, bookmark_id).await? {
        return Err(AppError::NotFound("bookmark"));
    }
    Ok(success_to_api_response(json!({ "id": bookmark_id })))
}
