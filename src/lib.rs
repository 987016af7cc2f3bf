use std::sync::Arc;

use config::Config;
use quota::{QuotaError, QuotaStore, RateLimiter, SpendLimits, SpendTracker};
use sqlx::PgPool;

pub mod common;
pub mod config;
pub mod convert;
pub mod error;
pub mod middleware;
pub mod quota;
pub mod router;
pub mod routes;
pub mod upstream;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub http: reqwest::Client,
    pub quota: Arc<dyn QuotaStore>,
    pub limiter: RateLimiter,
    pub spend: SpendTracker,
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Quota(#[from] QuotaError),
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, StateError> {
        let quota = quota::build_store(&config)?;
        Self::with_store(config, pool, quota)
    }

    pub fn with_store(
        config: Config,
        pool: PgPool,
        quota: Arc<dyn QuotaStore>,
    ) -> Result<Self, StateError> {
        let limiter = RateLimiter::new(
            quota.clone(),
            config.rate_limit_requests,
            config.rate_limit_window(),
        );
        let spend = SpendTracker::new(
            quota.clone(),
            SpendLimits {
                daily_usd: config.daily_spend_limit_usd,
                monthly_usd: config.monthly_spend_limit_usd,
            },
        );

        Ok(Self {
            pool,
            http: upstream::build_client()?,
            config,
            quota,
            limiter,
            spend,
        })
    }
}
