use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use redis::{Client as RedisClient, Script};

use super::{
    PeriodKey, QuotaError, QuotaStore, RateLimitDecision, RateLimitRecord, SpendLimits,
    SpendOutcome, SpendTotals,
};

// 检查与计数在同一个脚本里完成，多实例共享同一窗口
const HIT_SCRIPT: &str = r#"
local count = tonumber(redis.call('GET', KEYS[1]) or '0')
local ttl = redis.call('PTTL', KEYS[1])
if count >= tonumber(ARGV[1]) then
  return {0, count, ttl}
end
count = redis.call('INCR', KEYS[1])
if count == 1 or ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
  ttl = tonumber(ARGV[2])
end
return {1, count, ttl}
"#;

// 浮点数以字符串返回，避免 Lua 数字被截断为整数
const SPEND_SCRIPT: &str = r#"
local daily = tonumber(redis.call('GET', KEYS[1]) or '0')
local monthly = tonumber(redis.call('GET', KEYS[2]) or '0')
local cost = tonumber(ARGV[1])
if daily + cost > tonumber(ARGV[2]) or monthly + cost > tonumber(ARGV[3]) then
  return {'0', tostring(daily), tostring(monthly)}
end
daily = redis.call('INCRBYFLOAT', KEYS[1], ARGV[1])
monthly = redis.call('INCRBYFLOAT', KEYS[2], ARGV[1])
redis.call('EXPIREAT', KEYS[1], ARGV[4])
redis.call('EXPIREAT', KEYS[2], ARGV[5])
return {'1', daily, monthly}
"#;

/// 基于 Redis 的共享计数存储
pub struct RedisQuotaStore {
    redis: RedisClient,
    hit_script: Script,
    spend_script: Script,
}

impl RedisQuotaStore {
    pub fn new(redis: RedisClient) -> Self {
        Self {
            redis,
            hit_script: Script::new(HIT_SCRIPT),
            spend_script: Script::new(SPEND_SCRIPT),
        }
    }
}

fn parse_amount(raw: Option<String>) -> Result<f64, QuotaError> {
    match raw {
        Some(s) => s.trim().parse::<f64>().map_err(|_| QuotaError::Corrupt(s)),
        None => Ok(0.0),
    }
}

fn reset_at(now: DateTime<Utc>, ttl_ms: i64, window: TimeDelta) -> DateTime<Utc> {
    if ttl_ms < 0 {
        now + window
    } else {
        now + TimeDelta::milliseconds(ttl_ms)
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    async fn hit(
        &self,
        key: &str,
        ceiling: u32,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, QuotaError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (allowed, count, ttl): (i64, i64, i64) = self
            .hit_script
            .key(key)
            .arg(ceiling)
            .arg(window.num_milliseconds().max(1))
            .invoke_async(&mut conn)
            .await?;

        let record = RateLimitRecord {
            count: count.clamp(0, u32::MAX as i64) as u32,
            window_reset_at: reset_at(now, ttl, window),
        };
        Ok(RateLimitDecision::from_record(allowed == 1, ceiling, &record))
    }

    async fn peek_window(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitRecord>, QuotaError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (count, ttl): (Option<u32>, i64) = redis::pipe()
            .cmd("GET")
            .arg(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await?;

        Ok(count.filter(|_| ttl >= 0).map(|count| RateLimitRecord {
            count,
            window_reset_at: now + TimeDelta::milliseconds(ttl),
        }))
    }

    async fn try_spend(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        cost_usd: f64,
        limits: SpendLimits,
        _now: DateTime<Utc>,
    ) -> Result<SpendOutcome, QuotaError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (accepted, d, m): (String, String, String) = self
            .spend_script
            .key(&daily.key)
            .key(&monthly.key)
            .arg(cost_usd)
            .arg(limits.daily_usd)
            .arg(limits.monthly_usd)
            .arg(daily.ends_at.timestamp())
            .arg(monthly.ends_at.timestamp())
            .invoke_async(&mut conn)
            .await?;

        Ok(SpendOutcome {
            accepted: accepted == "1",
            totals: SpendTotals {
                daily_usd: parse_amount(Some(d))?,
                monthly_usd: parse_amount(Some(m))?,
            },
        })
    }

    async fn add_spend(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        amount_usd: f64,
        _now: DateTime<Utc>,
    ) -> Result<SpendTotals, QuotaError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (d, m): (String, String) = redis::pipe()
            .atomic()
            .cmd("INCRBYFLOAT")
            .arg(&daily.key)
            .arg(amount_usd)
            .cmd("EXPIREAT")
            .arg(&daily.key)
            .arg(daily.ends_at.timestamp())
            .ignore()
            .cmd("INCRBYFLOAT")
            .arg(&monthly.key)
            .arg(amount_usd)
            .cmd("EXPIREAT")
            .arg(&monthly.key)
            .arg(monthly.ends_at.timestamp())
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(SpendTotals {
            daily_usd: parse_amount(Some(d))?,
            monthly_usd: parse_amount(Some(m))?,
        })
    }

    async fn spend_totals(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        _now: DateTime<Utc>,
    ) -> Result<SpendTotals, QuotaError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&daily.key)
            .arg(&monthly.key)
            .query_async(&mut conn)
            .await?;
        let mut values = values.into_iter();

        Ok(SpendTotals {
            daily_usd: parse_amount(values.next().flatten())?,
            monthly_usd: parse_amount(values.next().flatten())?,
        })
    }
}
