use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors, rate_limit},
    routes,
};

// 外部数据代理，失败时返回静态数据
fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(routes::health))
        .route("/exchange-rates", get(routes::exchange::get_exchange_rates))
        .route("/weather", get(routes::weather::get_weather))
        .route("/news", get(routes::news::get_news))
}

// AI 聊天代理；限流只作用于补全接口
fn ai_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/ai/chat",
            post(routes::chat::chat_completion)
                .layer(from_fn_with_state(state.clone(), rate_limit)),
        )
        .route("/ai/usage", get(routes::chat::get_usage))
}

// 需要认证的内容接口
fn content_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        .route(
            "/bookmarks",
            get(routes::bookmarks::list_bookmarks).post(routes::bookmarks::add_bookmark),
        )
        .route("/bookmarks/{id}", delete(routes::bookmarks::remove_bookmark))
        .route(
            "/search-history",
            get(routes::search_history::list_search_history)
                .post(routes::search_history::record_search)
                .delete(routes::search_history::clear_search_history),
        )
        .route(
            "/preferences",
            get(routes::preferences::get_preferences)
                .put(routes::preferences::update_preferences),
        )
        .route(
            "/articles",
            get(routes::articles::list_articles).post(routes::articles::create_article),
        )
        .route("/articles/{id}", get(routes::articles::get_article))
        .route(
            "/articles/{id}/{action}",
            post(routes::articles::transition_article),
        )
        .layer(from_fn_with_state(state.clone(), auth_middleware))
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(data_routes())
        .merge(ai_routes(&state))
        .merge(content_routes(&state));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // axum 不允许在根路径 nest
    let base = state.config.api_base_uri.trim_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&format!("/{}", base), api)
    };

    router
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
