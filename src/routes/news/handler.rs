use axum::{
    Json,
    extract::{Query, State},
};

use super::model::{DEFAULT_QUERY, NewsQuery, NewsResponse, fallback_news};
use crate::{
    AppState,
    upstream::{UpstreamError, fetch_json, require_key},
};

const HEADLINE_CATEGORIES: &[&str] = &[
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

async fn fetch_news(
    state: &AppState,
    query: &str,
    category: Option<&str>,
    page_size: u32,
) -> Result<NewsResponse, UpstreamError> {
    let config = &state.config;
    let api_key = require_key(config.news_api_key.as_deref(), "NewsAPI")?;
    let page_size = page_size.to_string();

    // NewsAPI 自带分类走 top-headlines，其余按关键词搜索
    let request = match category.filter(|c| HEADLINE_CATEGORIES.contains(c)) {
        Some(category) => state
            .http
            .get(format!("{}/top-headlines", config.news_api_base_url))
            .query(&[
                ("country", "ae"),
                ("category", category),
                ("pageSize", page_size.as_str()),
            ]),
        None => state
            .http
            .get(format!("{}/everything", config.news_api_base_url))
            .query(&[
                ("q", query),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ]),
    }
    .header("X-Api-Key", api_key);

    let mut news: NewsResponse = fetch_json(request, config.upstream_timeout()).await?;
    if news.status != "ok" {
        return Err(UpstreamError::Rejected(
            news.message.unwrap_or_else(|| news.status.clone()),
        ));
    }
    news.fallback = false;
    news.error = false;
    Ok(news)
}

#[axum::debug_handler]
pub async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Json<NewsResponse> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_QUERY);
    let category = query
        .category
        .as_deref()
        .map(|c| c.trim().to_ascii_lowercase())
        .filter(|c| !c.is_empty());
    let page_size = query.effective_page_size();

    match fetch_news(&state, q, category.as_deref(), page_size).await {
        Ok(news) => Json(news),
        Err(e) if e.is_timeout() => {
            tracing::warn!(
                "News upstream timed out after {:?} for {:?}, serving fallback",
                state.config.upstream_timeout(),
                q
            );
            Json(fallback_news(category.as_deref(), page_size))
        }
        Err(e) => {
            tracing::warn!("News upstream unavailable for {:?}, serving fallback: {}", q, e);
            Json(fallback_news(category.as_deref(), page_size))
        }
    }
}
