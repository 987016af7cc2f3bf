use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::quota::{LimitUsage, RateLimitDecision, SpendDecision, spend::SpendUsage};
use crate::quota::spend::estimate_tokens;
use crate::utils::error_codes;

pub const FALLBACK_REPLY: &str = "I'm having trouble connecting to the assistant right now. \
Please try again in a few minutes. In the meantime you can browse the latest Dubai news, \
government services and weather on MyDub.AI.";

/// 单次请求允许的最大输出 token
pub const MAX_TOKENS_LIMIT: u64 = 1_000_000;

/// 已校验的聊天请求；原始 JSON 原样转发给上游
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Value>,
    pub max_tokens: Option<u64>,
    pub stream: bool,
    pub body: Map<String, Value>,
}

#[derive(Debug, PartialEq)]
pub enum ChatValidationError {
    InvalidJson,
    MissingModel,
    MissingMessages,
    InvalidField(&'static str),
}

impl ChatValidationError {
    pub fn message(&self) -> &'static str {
        match self {
            ChatValidationError::InvalidJson => "Request body must be a JSON object",
            ChatValidationError::MissingModel => "Missing required field: model",
            ChatValidationError::MissingMessages => "Missing required field: messages",
            ChatValidationError::InvalidField(field) => field,
        }
    }
}

impl ChatRequest {
    pub fn parse(raw: &[u8]) -> Result<Self, ChatValidationError> {
        let body: Map<String, Value> =
            serde_json::from_slice(raw).map_err(|_| ChatValidationError::InvalidJson)?;

        let model = body
            .get("model")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or(ChatValidationError::MissingModel)?
            .to_string();

        let messages = body
            .get("messages")
            .and_then(Value::as_array)
            .filter(|m| !m.is_empty())
            .cloned()
            .ok_or(ChatValidationError::MissingMessages)?;

        if let Some(t) = body.get("temperature") {
            if !t.is_null() && !t.as_f64().is_some_and(|t| (0.0..=2.0).contains(&t)) {
                return Err(ChatValidationError::InvalidField(
                    "temperature must be a number between 0 and 2",
                ));
            }
        }

        let max_tokens = match body.get("max_tokens") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_u64()
                    .filter(|t| *t <= MAX_TOKENS_LIMIT)
                    .ok_or(ChatValidationError::InvalidField(
                        "max_tokens must be an integer between 0 and 1000000",
                    ))?,
            ),
        };

        let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

        Ok(Self {
            model,
            messages,
            max_tokens,
            stream,
            body,
        })
    }

    /// 预估 token：消息序列化长度 / 4，加上请求的最大输出长度
    pub fn estimated_tokens(&self) -> u64 {
        let serialized = serde_json::to_string(&self.messages).unwrap_or_default();
        estimate_tokens(&serialized).saturating_add(self.max_tokens.unwrap_or(0))
    }
}

pub fn usage_total_tokens(completion: &Value) -> Option<u64> {
    let usage = completion.get("usage")?;
    usage.get("total_tokens").and_then(Value::as_u64).or_else(|| {
        let prompt = usage.get("prompt_tokens").and_then(Value::as_u64)?;
        let completion = usage.get("completion_tokens").and_then(Value::as_u64)?;
        Some(prompt + completion)
    })
}

pub fn fallback_completion(model: &str, now: DateTime<Utc>) -> Value {
    json!({
        "id": format!("fallback-{}", uuid::Uuid::new_v4()),
        "object": "chat.completion",
        "created": now.timestamp(),
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": FALLBACK_REPLY },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0 },
        "fallback": true,
        "error": true
    })
}

#[derive(Debug, Serialize)]
pub struct WindowLimit {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl From<&RateLimitDecision> for WindowLimit {
    fn from(d: &RateLimitDecision) -> Self {
        Self {
            limit: d.limit,
            remaining: d.remaining,
            reset_at: d.reset_at,
        }
    }
}

pub fn rate_limited_body(decision: &RateLimitDecision, retry_after: u64) -> Value {
    json!({
        "code": error_codes::RATE_LIMIT,
        "error": "Rate limit exceeded",
        "message": format!("Too many requests. Try again in {} seconds.", retry_after),
        "limits": { "hourly": WindowLimit::from(decision) },
        "retry_after": retry_after
    })
}

pub fn spend_limited_body(decision: &SpendDecision) -> Value {
    let mut limits = Map::new();
    if decision.daily.spent_usd + decision.cost_usd > decision.daily.limit_usd {
        limits.insert("daily".into(), json!(decision.daily));
    }
    if decision.monthly.spent_usd + decision.cost_usd > decision.monthly.limit_usd {
        limits.insert("monthly".into(), json!(decision.monthly));
    }
    json!({
        "code": error_codes::SPEND_LIMIT,
        "error": "Spending limit exceeded",
        "message": "Your AI usage budget has been reached. Please try again later.",
        "estimated_cost_usd": decision.cost_usd,
        "limits": limits
    })
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub rate_limit: WindowLimit,
    pub daily: LimitUsage,
    pub monthly: LimitUsage,
}

impl UsageResponse {
    pub fn new(rate: &RateLimitDecision, spend: &SpendUsage) -> Self {
        Self {
            rate_limit: rate.into(),
            daily: spend.daily,
            monthly: spend.monthly,
        }
    }
}
