use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{Extensions, HeaderMap, HeaderValue, Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::{AppState, quota::RateLimitDecision, routes::chat::rate_limited_body, utils::token_fingerprint};

/// 调用方标识：Bearer 令牌摘要，否则来源 IP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn from_request(headers: &HeaderMap, extensions: &Extensions) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(token) = bearer {
            return CallerIdentity(format!("token:{}", token_fingerprint(token)));
        }

        // 从连接信息获取原始IP
        let remote_ip = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0.ip().to_string());

        // 优先使用代理转发的IP
        let ip = headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .filter(|ip| !ip.trim().is_empty())
            .or_else(|| {
                headers
                    .get("x-forwarded-for")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
            })
            .or(remote_ip.as_deref())
            .unwrap_or("unknown")
            .trim();

        CallerIdentity(format!("ip:{}", ip))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<CallerIdentity>() {
            return Ok(identity.clone());
        }
        Ok(CallerIdentity::from_request(&parts.headers, &parts.extensions))
    }
}

fn set_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_at.timestamp()),
    );
}

fn rate_limited_response(decision: &RateLimitDecision) -> Response {
    let retry_after = decision.retry_after_secs(Utc::now());
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(rate_limited_body(decision, retry_after)),
    )
        .into_response();
    let headers = response.headers_mut();
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    set_limit_headers(headers, decision);
    response
}

pub async fn rate_limit(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let identity = CallerIdentity::from_request(req.headers(), req.extensions());

    let decision = match state.limiter.check_rate_limit(identity.as_str()).await {
        Ok(decision) if !decision.allowed => return rate_limited_response(&decision),
        Ok(decision) => Some(decision),
        // 计数存储不可用时放行
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing {}: {}", identity.as_str(), e);
            None
        }
    };

    tracing::debug!("Request admitted for {}", identity.as_str());
    req.extensions_mut().insert(identity);

    let mut response = next.run(req).await;
    if let Some(decision) = decision {
        set_limit_headers(response.headers_mut(), &decision);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(pairs: &[(&'static str, &str)]) -> CallerIdentity {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        CallerIdentity::from_request(&headers, &Extensions::new())
    }

    #[test]
    fn bearer_token_takes_precedence() {
        let id = identity(&[("authorization", "Bearer abc"), ("x-real-ip", "1.1.1.1")]);
        assert_eq!(id.as_str(), format!("token:{}", token_fingerprint("abc")));
    }

    #[test]
    fn falls_back_through_ip_headers() {
        assert_eq!(identity(&[("x-real-ip", "1.1.1.1")]).as_str(), "ip:1.1.1.1");
        assert_eq!(
            identity(&[("x-forwarded-for", " , 2.2.2.2, 3.3.3.3")]).as_str(),
            "ip:2.2.2.2"
        );
        assert_eq!(identity(&[]).as_str(), "ip:unknown");
    }

    #[test]
    fn uses_socket_address_without_proxy_headers() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4444))));
        let id = CallerIdentity::from_request(&HeaderMap::new(), &extensions);
        assert_eq!(id.as_str(), "ip:10.0.0.7");
    }
}
