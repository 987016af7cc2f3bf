mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header as http_header},
};
use common::{get, get_as_caller, json_body, post_json, send, test_app, test_config};
use mydub_backend::config::Config;
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

const CHAT: &str = "/api/ai/chat";
const USAGE: &str = "/api/ai/usage";
const MODEL: &str = "openai/gpt-4o-mini";
const HELLO: &str =
    r#"{"model":"openai/gpt-4o-mini","messages":[{"role":"user","content":"Best brunch in JBR?"}]}"#;

fn completion(total_tokens: u64) -> Value {
    json!({
        "id": "gen-123",
        "object": "chat.completion",
        "model": MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Try Bread Ahead at The Beach."},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": total_tokens - 12, "total_tokens": total_tokens}
    })
}

/// 配置了 OpenRouter 密钥并指向 mock 的配置
fn keyed_config(server: &MockServer) -> Config {
    Config {
        openrouter_api_key: Some("router-key".into()),
        openrouter_base_url: server.uri(),
        ..test_config()
    }
}

async fn mount_completion(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let app = test_app(test_config());
    let response = send(&app, post_json(CHAT, "{not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_model_is_rejected() {
    let app = test_app(test_config());
    let response = send(
        &app,
        post_json(CHAT, r#"{"messages":[{"role":"user","content":"hi"}]}"#),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn oversized_max_tokens_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(keyed_config(&server));
    let body = json!({
        "model": MODEL,
        "messages": [{"role": "user", "content": "hi"}],
        "max_tokens": 18446744073709551610u64
    });
    let response = send(&app, post_json(CHAT, &body.to_string())).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn large_max_tokens_counts_against_daily_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(Config {
        daily_spend_limit_usd: 0.0001,
        ..keyed_config(&server)
    });
    let body = json!({
        "model": MODEL,
        "messages": [{"role": "user", "content": "hi"}],
        "max_tokens": 1_000_000
    });
    let response = send(&app, post_json(CHAT, &body.to_string())).await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = json_body(response).await;
    assert!(body["limits"]["daily"].is_object());
    assert!(body["estimated_cost_usd"].as_f64().is_some_and(|c| c > 0.1));
}

#[tokio::test]
async fn missing_key_serves_uncharged_fallback() {
    let app = test_app(Config {
        rate_limit_requests: 5,
        ..test_config()
    });
    let response = send(&app, post_json(CHAT, HELLO)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fallback"], true);
    assert_eq!(body["error"], true);
    assert_eq!(body["model"], MODEL);
    assert!(body["choices"][0]["message"]["content"].is_string());

    let usage = json_body(send(&app, get_as_caller(USAGE)).await).await;
    assert_eq!(usage["rate_limit"]["remaining"], 4);
    assert_eq!(usage["daily"]["spent_usd"], 0.0);
    assert_eq!(usage["monthly"]["spent_usd"], 0.0);
}

#[tokio::test]
async fn exceeding_hourly_ceiling_returns_429() {
    let app = test_app(Config {
        rate_limit_requests: 2,
        ..test_config()
    });

    for _ in 0..2 {
        assert_eq!(send(&app, post_json(CHAT, HELLO)).await.status(), StatusCode::OK);
    }

    let response = send(&app, post_json(CHAT, HELLO)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let body = json_body(response).await;
    assert_eq!(body["limits"]["hourly"]["limit"], 2);
    assert_eq!(body["limits"]["hourly"]["remaining"], 0);
}

#[tokio::test]
async fn exhausted_monthly_budget_returns_402() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = test_app(Config {
        monthly_spend_limit_usd: 0.0,
        ..keyed_config(&server)
    });
    let response = send(&app, post_json(CHAT, HELLO)).await;

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = json_body(response).await;
    assert!(body["limits"]["monthly"].is_object());
    assert!(body["limits"].get("daily").is_none());
    assert!(body["estimated_cost_usd"].as_f64().is_some_and(|c| c > 0.0));
}

#[tokio::test]
async fn upstream_completion_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer router-key"))
        .and(header("X-Title", "MyDub.AI"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(21)))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(keyed_config(&server));
    let response = send(&app, post_json(CHAT, HELLO)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, completion(21));
}

#[tokio::test]
async fn actual_usage_is_reconciled_into_spend() {
    let server = MockServer::start().await;
    mount_completion(&server, completion(100_000)).await;

    let app = test_app(keyed_config(&server));
    assert_eq!(send(&app, post_json(CHAT, HELLO)).await.status(), StatusCode::OK);

    // 预估 + 补记 = 实际 100k token，gpt-4o-mini 每千 token 0.00015 美元
    let usage = json_body(send(&app, get_as_caller(USAGE)).await).await;
    let daily = usage["daily"]["spent_usd"].as_f64().unwrap();
    let monthly = usage["monthly"]["spent_usd"].as_f64().unwrap();
    assert!((daily - 0.015).abs() < 1e-9, "daily spend {daily}");
    assert!((monthly - 0.015).abs() < 1e-9, "monthly spend {monthly}");
}

#[tokio::test]
async fn usage_reports_consumed_quota() {
    let server = MockServer::start().await;
    mount_completion(&server, completion(21)).await;

    let app = test_app(Config {
        rate_limit_requests: 5,
        ..keyed_config(&server)
    });
    send(&app, post_json(CHAT, HELLO)).await;

    let body = json_body(send(&app, get_as_caller(USAGE)).await).await;
    assert_eq!(body["rate_limit"]["limit"], 5);
    assert_eq!(body["rate_limit"]["remaining"], 4);
    assert!(body["daily"]["spent_usd"].as_f64().is_some_and(|s| s > 0.0));
}

#[tokio::test]
async fn streaming_response_is_relayed() {
    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Try\"}}]}\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\" JBR\"}}]}\n\n\
               data: [DONE]\n\n";
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(keyed_config(&server));
    let body = json!({
        "model": MODEL,
        "messages": [{"role": "user", "content": "Best brunch in JBR?"}],
        "stream": true
    });
    let response = send(&app, post_json(CHAT, &body.to_string())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[http_header::CONTENT_TYPE],
        "text/event-stream"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes, sse.as_bytes());
}

#[tokio::test]
async fn upstream_failure_serves_fallback_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let app = test_app(keyed_config(&server));
    let response = send(&app, post_json(CHAT, HELLO)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["fallback"], true);
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let app = test_app(test_config());
    let request = Request::builder()
        .method("OPTIONS")
        .uri(CHAT)
        .header("origin", "https://mydub.ai")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type,authorization")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert!(headers.contains_key("access-control-allow-methods"));
    assert!(headers.contains_key("access-control-allow-headers"));
}

#[tokio::test]
async fn content_routes_require_a_token() {
    let app = test_app(test_config());
    let response = send(&app, get("/api/profile")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
