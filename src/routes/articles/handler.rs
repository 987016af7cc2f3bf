use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::model::{
    Article, ArticleAction, CreateArticleRequest, ListArticlesQuery, TransitionOutcome,
    TransitionRequest,
};
use crate::{
    AppState, common::ApiResponse, error::AppError, middleware::AuthUser,
    utils::success_to_api_response,
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[axum::debug_handler]
pub async fn create_article(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Article>>), AppError> {
    req.validate().map_err(AppError::Validation)?;
    let article = Article::create(&state.pool, user.id, req).await?;
    Ok((StatusCode::CREATED, success_to_api_response(article)))
}

#[axum::debug_handler]
pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> Result<Json<ApiResponse<Vec<Article>>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let articles = Article::list(&state.pool, query.status, limit).await?;
    Ok(success_to_api_response(articles))
}

#[axum::debug_handler]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Article>>, AppError> {
    let article = Article::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("article"))?;
    Ok(success_to_api_response(article))
}

#[axum::debug_handler]
pub async fn transition_article(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((id, action)): Path<(Uuid, ArticleAction)>,
    body: Option<Json<TransitionRequest>>,
) -> Result<Json<ApiResponse<Article>>, AppError> {
    let notes = body.and_then(|Json(req)| req.notes);

    match Article::transition(&state.pool, id, action, user.id, notes).await? {
        TransitionOutcome::Updated(article) => Ok(success_to_api_response(article)),
        TransitionOutcome::NotFound => Err(AppError::NotFound("article")),
        TransitionOutcome::Illegal(e) => Err(AppError::Conflict(e.to_string())),
        TransitionOutcome::Conflict => Err(AppError::Conflict(
            "article was modified concurrently, reload and retry".into(),
        )),
    }
}
