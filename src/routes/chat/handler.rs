use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde_json::{Value, json};

use super::model::{
    ChatRequest, UsageResponse, fallback_completion, spend_limited_body, usage_total_tokens,
};
use crate::{AppState, error::AppError, middleware::CallerIdentity, utils::error_codes};

fn fallback_response(model: &str) -> Response {
    (StatusCode::OK, Json(fallback_completion(model, Utc::now()))).into_response()
}

#[axum::debug_handler]
pub async fn chat_completion(
    State(state): State<AppState>,
    identity: CallerIdentity,
    body: Bytes,
) -> Response {
    let request = match ChatRequest::parse(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "code": error_codes::VALIDATION_ERROR,
                    "error": e.message()
                })),
            )
                .into_response();
        }
    };

    // 未配置密钥时直接降级，不计入花费
    let config = &state.config;
    let Some(api_key) = config.openrouter_api_key.as_deref() else {
        tracing::warn!("OpenRouter API key is not configured, serving fallback reply");
        return fallback_response(&request.model);
    };

    let estimated_tokens = request.estimated_tokens();
    match state
        .spend
        .track_cost(identity.as_str(), &request.model, estimated_tokens)
        .await
    {
        Ok(decision) if !decision.allowed => {
            return (
                StatusCode::PAYMENT_REQUIRED,
                Json(spend_limited_body(&decision)),
            )
                .into_response();
        }
        Ok(_) => {}
        // 计数存储不可用时放行
        Err(e) => tracing::warn!("Spend tracking unavailable, allowing request: {}", e),
    }

    let upstream = state
        .http
        .post(format!("{}/chat/completions", config.openrouter_base_url))
        .bearer_auth(api_key)
        .header("HTTP-Referer", &config.app_url)
        .header("X-Title", "MyDub.AI")
        .json(&request.body)
        .timeout(config.ai_timeout())
        .send()
        .await;

    let response = match upstream {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            tracing::warn!(
                "Chat upstream returned {} for model {}, serving fallback reply",
                response.status(),
                request.model
            );
            return fallback_response(&request.model);
        }
        Err(e) => {
            tracing::warn!("Chat upstream request failed: {}, serving fallback reply", e);
            return fallback_response(&request.model);
        }
    };

    if request.stream {
        // 流式响应原样转发，只计入预估花费
        let stream = response
            .bytes_stream()
            .inspect_err(|e| tracing::warn!("Chat stream interrupted: {}", e));
        return (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(stream),
        )
            .into_response();
    }

    let completion: Value = match response.json().await {
        Ok(completion) => completion,
        Err(e) => {
            tracing::warn!("Chat upstream returned an unreadable body: {}", e);
            return fallback_response(&request.model);
        }
    };

    if let Some(actual_tokens) = usage_total_tokens(&completion) {
        if let Err(e) = state
            .spend
            .reconcile(identity.as_str(), &request.model, estimated_tokens, actual_tokens)
            .await
        {
            tracing::warn!("Failed to reconcile spend for {}: {}", identity.as_str(), e);
        }
    }

    (StatusCode::OK, Json(completion)).into_response()
}

#[axum::debug_handler]
pub async fn get_usage(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> Result<Json<UsageResponse>, AppError> {
    let now = Utc::now();
    let rate = state.limiter.status(identity.as_str(), now).await?;
    let spend = state.spend.usage(identity.as_str(), now).await?;
    Ok(Json(UsageResponse::new(&rate, &spend)))
}
