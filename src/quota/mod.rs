//! Per-caller request quotas for the AI chat proxy.
//!
//! Counters are keyed by caller identity and calendar period (see [`keys`]).
//! The [`QuotaStore`] trait hides where they live: process memory by
//! default, or Redis when several instances must share one budget.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::config::{Config, QuotaBackend};

pub mod keys;
pub mod limiter;
pub mod memory;
pub mod models;
pub mod redis;
pub mod spend;

pub use keys::PeriodKey;
pub use limiter::RateLimiter;
pub use memory::MemoryQuotaStore;
pub use models::*;
pub use redis::RedisQuotaStore;
pub use spend::SpendTracker;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("corrupt counter value `{0}`")]
    Corrupt(String),
}

#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// 检查并计数：窗口过期先归零，达到上限则拒绝且不计数
    async fn hit(
        &self,
        key: &str,
        ceiling: u32,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, QuotaError>;

    /// 只读当前窗口，不计数；窗口已过期返回 None
    async fn peek_window(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitRecord>, QuotaError>;

    /// 任一周期超限则拒绝且不修改；否则同时提交日、月累计
    async fn try_spend(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        cost_usd: f64,
        limits: SpendLimits,
        now: DateTime<Utc>,
    ) -> Result<SpendOutcome, QuotaError>;

    /// 无条件累加（请求已完成后的对账）
    async fn add_spend(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        amount_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<SpendTotals, QuotaError>;

    async fn spend_totals(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        now: DateTime<Utc>,
    ) -> Result<SpendTotals, QuotaError>;

    /// 清理过期记录，返回清理条数
    async fn sweep(&self, _now: DateTime<Utc>) -> usize {
        0
    }
}

pub fn build_store(config: &Config) -> Result<Arc<dyn QuotaStore>, QuotaError> {
    match (config.quota_backend, config.redis_url.as_deref()) {
        (QuotaBackend::Redis, Some(url)) => {
            let client = ::redis::Client::open(url)?;
            tracing::info!("Using Redis quota store");
            Ok(Arc::new(RedisQuotaStore::new(client)))
        }
        _ => {
            tracing::info!("Using in-memory quota store (per-process limits)");
            Ok(Arc::new(MemoryQuotaStore::default()))
        }
    }
}
