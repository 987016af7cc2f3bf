use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// 上游数据源失败的原因，只写日志，不返回给客户端
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{0} API key is not configured")]
    MissingApiKey(&'static str),
    #[error("upstream returned status {0}")]
    Status(StatusCode),
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream reported failure: {0}")]
    Rejected(String),
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Transport(e) if e.is_timeout())
    }
}

pub fn build_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(concat!("mydub-backend/", env!("CARGO_PKG_VERSION")))
        .build()
}

pub fn require_key<'a>(key: Option<&'a str>, provider: &'static str) -> Result<&'a str, UpstreamError> {
    key.ok_or(UpstreamError::MissingApiKey(provider))
}

/// 发送请求并解析 JSON；超时、非 2xx、解析失败都视为失败，不重试
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> Result<T, UpstreamError> {
    let response = request.timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Status(status));
    }

    Ok(response.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    #[tokio::test]
    async fn slow_upstream_is_reported_as_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(serde_json::json!({"ok": true})),
            )
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let err = fetch_json::<Value>(client.get(server.uri()), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn error_status_is_not_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = build_client().unwrap();
        let err = fetch_json::<Value>(client.get(server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!err.is_timeout());
        assert!(!UpstreamError::MissingApiKey("NewsAPI").is_timeout());
    }
}
