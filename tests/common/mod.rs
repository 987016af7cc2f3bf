#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use mydub_backend::{AppState, config::Config, quota::MemoryQuotaStore, router::create_router};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

/// 不连接数据库的测试配置
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/mydub_test".into(),
        jwt_secret: Some("test-secret".into()),
        ..Config::default()
    }
}

pub fn test_app(config: Config) -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    let state = AppState::with_store(config, pool, Arc::new(MemoryQuotaStore::default()))
        .expect("app state");
    create_router(state)
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("request failed")
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-real-ip", CALLER_IP)
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub const CALLER_IP: &str = "203.0.113.7";

/// 以 post_json 相同的调用方身份发起 GET
pub fn get_as_caller(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-real-ip", CALLER_IP)
        .body(Body::empty())
        .expect("request")
}
