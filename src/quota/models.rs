use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 限流窗口计数
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

/// 某个周期（日 / 月）内的累计花费
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpendRecord {
    pub amount_usd: f64,
    pub period_ends_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    pub fn from_record(allowed: bool, limit: u32, record: &RateLimitRecord) -> Self {
        Self {
            allowed,
            limit,
            remaining: limit.saturating_sub(record.count),
            reset_at: record.window_reset_at,
        }
    }

    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.reset_at - now).num_seconds().max(1) as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendLimits {
    pub daily_usd: f64,
    pub monthly_usd: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpendTotals {
    pub daily_usd: f64,
    pub monthly_usd: f64,
}

/// 存储层一次“检查并提交”的结果；拒绝时 totals 为提交前的值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendOutcome {
    pub accepted: bool,
    pub totals: SpendTotals,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct LimitUsage {
    pub spent_usd: f64,
    pub limit_usd: f64,
    pub remaining_usd: f64,
    pub reset_at: DateTime<Utc>,
}

impl LimitUsage {
    pub fn new(spent_usd: f64, limit_usd: f64, reset_at: DateTime<Utc>) -> Self {
        Self {
            spent_usd,
            limit_usd,
            remaining_usd: (limit_usd - spent_usd).max(0.0),
            reset_at,
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct SpendDecision {
    pub allowed: bool,
    pub cost_usd: f64,
    pub daily: LimitUsage,
    pub monthly: LimitUsage,
}
