use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
};
use serde_json::json;

use super::model::{ListHistoryQuery, RecordSearchRequest, SearchHistoryEntry};
use crate::{
    AppState, common::ApiResponse, error::AppError, middleware::AuthUser,
    utils::success_to_api_response,
};

#[axum::debug_handler]
pub async fn list_search_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListHistoryQuery>,
) -> Result<Json<ApiResponse<Vec<SearchHistoryEntry>>>, AppError> {
    let entries = SearchHistoryEntry::list(&state.pool, user.id, query.effective_limit()).await?;
    Ok(success_to_api_response(entries))
}

#[axum::debug_handler]
pub async fn record_search(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RecordSearchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SearchHistoryEntry>>), AppError> {
    let query = req.normalized_query().map_err(AppError::Validation)?;
    let entry = SearchHistoryEntry::record(&state.pool, user.id, query, req.filters).await?;
    Ok((StatusCode::CREATED, success_to_api_response(entry)))
}

#[axum::debug_handler]
pub async fn clear_search_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let removed = SearchHistoryEntry::clear(&state.pool, user.id).await?;
    tracing::info!("Cleared {} search history entries for {}", removed, user.id);
    Ok(success_to_api_response(json!({ "removed": removed })))
}
