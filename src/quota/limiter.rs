use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::{QuotaError, QuotaStore, RateLimitDecision, keys::rate_limit_key};

/// 按调用方与自然日分窗的请求限流
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn QuotaStore>,
    ceiling: u32,
    window: TimeDelta,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn QuotaStore>, ceiling: u32, window: Duration) -> Self {
        Self {
            store,
            ceiling,
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::hours(1)),
        }
    }

    pub async fn check_rate_limit(&self, identity: &str) -> Result<RateLimitDecision, QuotaError> {
        self.check_rate_limit_at(identity, self.ceiling, Utc::now())
            .await
    }

    pub async fn check_rate_limit_at(
        &self,
        identity: &str,
        ceiling: u32,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, QuotaError> {
        let key = rate_limit_key(identity, now);
        let decision = self.store.hit(&key, ceiling, self.window, now).await?;
        if !decision.allowed {
            tracing::warn!(
                "Rate limit exceeded for {} ({} requests, resets at {})",
                identity,
                ceiling,
                decision.reset_at
            );
        }
        Ok(decision)
    }

    /// 当前窗口状态，不计数
    pub async fn status(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, QuotaError> {
        let key = rate_limit_key(identity, now);
        let decision = match self.store.peek_window(&key, now).await? {
            Some(record) => {
                RateLimitDecision::from_record(record.count < self.ceiling, self.ceiling, &record)
            }
            None => RateLimitDecision {
                allowed: self.ceiling > 0,
                limit: self.ceiling,
                remaining: self.ceiling,
                reset_at: now + self.window,
            },
        };
        Ok(decision)
    }
}
