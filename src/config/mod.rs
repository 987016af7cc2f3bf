use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("QUOTA_BACKEND=redis requires REDIS_URL")]
    RedisUrlRequired,
    #[error("unknown QUOTA_BACKEND `{0}`, expected `memory` or `redis`")]
    UnknownQuotaBackend(String),
}

/// 配额计数存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaBackend {
    Memory,
    Redis,
}

impl FromStr for QuotaBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "" => Ok(QuotaBackend::Memory),
            "redis" => Ok(QuotaBackend::Redis),
            other => Err(ConfigError::UnknownQuotaBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub quota_backend: QuotaBackend,
    pub jwt_secret: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub app_url: String,
    pub upstream_timeout_secs: u64,
    pub ai_timeout_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub daily_spend_limit_usd: f64,
    pub monthly_spend_limit_usd: f64,
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub exchange_rate_api_key: Option<String>,
    pub exchange_rate_base_url: String,
    pub news_api_key: Option<String>,
    pub news_api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/mydub".into(),
            redis_url: None,
            quota_backend: QuotaBackend::Memory,
            jwt_secret: None,
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            app_url: "https://mydub.ai".into(),
            upstream_timeout_secs: 10,
            ai_timeout_secs: 60,
            rate_limit_window_secs: 3600,
            rate_limit_requests: 100,
            daily_spend_limit_usd: 5.0,
            monthly_spend_limit_usd: 50.0,
            openrouter_api_key: None,
            openrouter_base_url: "https://openrouter.ai/api/v1".into(),
            openweather_api_key: None,
            openweather_base_url: "https://api.openweathermap.org/data/2.5".into(),
            exchange_rate_api_key: None,
            exchange_rate_base_url: "https://v6.exchangerate-api.com/v6".into(),
            news_api_key: None,
            news_api_base_url: "https://newsapi.org/v2".into(),
        }
    }
}

// 空字符串视为未设置
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    match optional(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid value for {}: {:?}, using default", name, raw);
            default
        }),
        None => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let quota_backend: QuotaBackend = optional("QUOTA_BACKEND")
            .unwrap_or_default()
            .parse()?;
        let redis_url = optional("REDIS_URL");
        if quota_backend == QuotaBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::RedisUrlRequired);
        }

        // 限流窗口兼容 "1h" 写法
        let rate_limit_window_secs = match optional("RATE_LIMIT_WINDOW") {
            Some(raw) if raw.ends_with('h') => raw
                .trim_end_matches('h')
                .parse::<u64>()
                .map(|h| h * 3600)
                .unwrap_or(defaults.rate_limit_window_secs),
            Some(raw) => raw.parse().unwrap_or(defaults.rate_limit_window_secs),
            None => defaults.rate_limit_window_secs,
        };

        Ok(Config {
            database_url: optional("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
            redis_url,
            quota_backend,
            jwt_secret: optional("JWT_SECRET"),
            server_host: optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed_or("SERVER_PORT", defaults.server_port),
            api_base_uri: optional("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            app_url: optional("APP_URL").unwrap_or(defaults.app_url),
            upstream_timeout_secs: parsed_or("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout_secs),
            ai_timeout_secs: parsed_or("AI_TIMEOUT_SECS", defaults.ai_timeout_secs),
            rate_limit_window_secs,
            rate_limit_requests: parsed_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            daily_spend_limit_usd: parsed_or("DAILY_SPEND_LIMIT_USD", defaults.daily_spend_limit_usd),
            monthly_spend_limit_usd: parsed_or(
                "MONTHLY_SPEND_LIMIT_USD",
                defaults.monthly_spend_limit_usd,
            ),
            openrouter_api_key: optional("OPENROUTER_API_KEY"),
            openrouter_base_url: optional("OPENROUTER_BASE_URL")
                .unwrap_or(defaults.openrouter_base_url),
            openweather_api_key: optional("OPENWEATHER_API_KEY"),
            openweather_base_url: optional("OPENWEATHER_BASE_URL")
                .unwrap_or(defaults.openweather_base_url),
            exchange_rate_api_key: optional("EXCHANGE_RATE_API_KEY"),
            exchange_rate_base_url: optional("EXCHANGE_RATE_BASE_URL")
                .unwrap_or(defaults.exchange_rate_base_url),
            news_api_key: optional("NEWS_API_KEY"),
            news_api_base_url: optional("NEWS_API_BASE_URL").unwrap_or(defaults.news_api_base_url),
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
