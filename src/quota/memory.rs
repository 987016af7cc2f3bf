use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::{
    PeriodKey, QuotaError, QuotaStore, RateLimitDecision, RateLimitRecord, SpendLimits,
    SpendOutcome, SpendRecord, SpendTotals,
};

/// 进程内计数存储；重启即丢失，多实例之间不共享
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    windows: Mutex<HashMap<String, RateLimitRecord>>,
    spend: Mutex<HashMap<String, SpendRecord>>,
}

fn current_amount(spend: &HashMap<String, SpendRecord>, key: &PeriodKey, now: DateTime<Utc>) -> f64 {
    spend
        .get(&key.key)
        .filter(|r| r.period_ends_at > now)
        .map(|r| r.amount_usd)
        .unwrap_or(0.0)
}

fn commit(spend: &mut HashMap<String, SpendRecord>, key: &PeriodKey, amount_usd: f64) {
    spend.insert(
        key.key.clone(),
        SpendRecord {
            amount_usd,
            period_ends_at: key.ends_at,
        },
    );
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn hit(
        &self,
        key: &str,
        ceiling: u32,
        window: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, QuotaError> {
        let mut windows = self.windows.lock();
        let record = windows
            .entry(key.to_string())
            .or_insert_with(|| RateLimitRecord {
                count: 0,
                window_reset_at: now + window,
            });

        if now > record.window_reset_at {
            record.count = 0;
            record.window_reset_at = now + window;
        }

        if record.count >= ceiling {
            return Ok(RateLimitDecision::from_record(false, ceiling, record));
        }

        record.count += 1;
        Ok(RateLimitDecision::from_record(true, ceiling, record))
    }

    async fn peek_window(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitRecord>, QuotaError> {
        Ok(self
            .windows
            .lock()
            .get(key)
            .filter(|r| now <= r.window_reset_at)
            .cloned())
    }

    async fn try_spend(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        cost_usd: f64,
        limits: SpendLimits,
        now: DateTime<Utc>,
    ) -> Result<SpendOutcome, QuotaError> {
        let mut spend = self.spend.lock();
        let totals = SpendTotals {
            daily_usd: current_amount(&spend, daily, now),
            monthly_usd: current_amount(&spend, monthly, now),
        };

        if totals.daily_usd + cost_usd > limits.daily_usd
            || totals.monthly_usd + cost_usd > limits.monthly_usd
        {
            return Ok(SpendOutcome {
                accepted: false,
                totals,
            });
        }

        let totals = SpendTotals {
            daily_usd: totals.daily_usd + cost_usd,
            monthly_usd: totals.monthly_usd + cost_usd,
        };
        commit(&mut spend, daily, totals.daily_usd);
        commit(&mut spend, monthly, totals.monthly_usd);

        Ok(SpendOutcome {
            accepted: true,
            totals,
        })
    }

    async fn add_spend(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        amount_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<SpendTotals, QuotaError> {
        let mut spend = self.spend.lock();
        let totals = SpendTotals {
            daily_usd: current_amount(&spend, daily, now) + amount_usd,
            monthly_usd: current_amount(&spend, monthly, now) + amount_usd,
        };
        commit(&mut spend, daily, totals.daily_usd);
        commit(&mut spend, monthly, totals.monthly_usd);
        Ok(totals)
    }

    async fn spend_totals(
        &self,
        daily: &PeriodKey,
        monthly: &PeriodKey,
        now: DateTime<Utc>,
    ) -> Result<SpendTotals, QuotaError> {
        let spend = self.spend.lock();
        Ok(SpendTotals {
            daily_usd: current_amount(&spend, daily, now),
            monthly_usd: current_amount(&spend, monthly, now),
        })
    }

    async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        {
            let mut windows = self.windows.lock();
            let before = windows.len();
            windows.retain(|_, r| now <= r.window_reset_at);
            removed += before - windows.len();
        }
        {
            let mut spend = self.spend.lock();
            let before = spend.len();
            spend.retain(|_, r| r.period_ends_at > now);
            removed += before - spend.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::keys::{daily_spend_key, monthly_spend_key};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 21, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn rejects_after_ceiling_until_window_resets() {
        let store = MemoryQuotaStore::default();
        let window = TimeDelta::hours(1);

        for i in 0..3 {
            let d = store.hit("k", 3, window, at(10, i)).await.unwrap();
            assert!(d.allowed);
            assert_eq!(d.remaining, 2 - i);
        }

        let rejected = store.hit("k", 3, window, at(10, 30)).await.unwrap();
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
        assert_eq!(rejected.reset_at, at(11, 0));

        // 到达重置时间点仍在窗口内
        assert!(!store.hit("k", 3, window, at(11, 0)).await.unwrap().allowed);

        let after = store.hit("k", 3, window, at(11, 1)).await.unwrap();
        assert!(after.allowed);
        assert_eq!(after.remaining, 2);
        assert_eq!(after.reset_at, at(12, 1));
    }

    #[tokio::test]
    async fn rejection_does_not_increment() {
        let store = MemoryQuotaStore::default();
        let window = TimeDelta::hours(1);
        store.hit("k", 1, window, at(9, 0)).await.unwrap();
        for _ in 0..5 {
            store.hit("k", 1, window, at(9, 1)).await.unwrap();
        }
        let record = store.peek_window("k", at(9, 2)).await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn spend_rejected_without_mutation() {
        let store = MemoryQuotaStore::default();
        let now = at(12, 0);
        let daily = daily_spend_key("id", now);
        let monthly = monthly_spend_key("id", now);
        let limits = SpendLimits {
            daily_usd: 1.0,
            monthly_usd: 10.0,
        };

        let first = store.try_spend(&daily, &monthly, 0.6, limits, now).await.unwrap();
        assert!(first.accepted);

        let second = store.try_spend(&daily, &monthly, 0.6, limits, now).await.unwrap();
        assert!(!second.accepted);
        assert!((second.totals.daily_usd - 0.6).abs() < 1e-9);

        let totals = store.spend_totals(&daily, &monthly, now).await.unwrap();
        assert!((totals.daily_usd - 0.6).abs() < 1e-9);
        assert!((totals.monthly_usd - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn spend_exactly_at_ceiling_is_accepted() {
        let store = MemoryQuotaStore::default();
        let now = at(12, 0);
        let daily = daily_spend_key("id", now);
        let monthly = monthly_spend_key("id", now);
        let limits = SpendLimits {
            daily_usd: 1.0,
            monthly_usd: 1.0,
        };
        assert!(store.try_spend(&daily, &monthly, 1.0, limits, now).await.unwrap().accepted);
        assert!(!store.try_spend(&daily, &monthly, 0.0001, limits, now).await.unwrap().accepted);
    }

    #[tokio::test]
    async fn sweep_drops_expired_records() {
        let store = MemoryQuotaStore::default();
        let now = at(23, 0);
        store.hit("k", 5, TimeDelta::minutes(30), now).await.unwrap();
        let daily = daily_spend_key("id", now);
        let monthly = monthly_spend_key("id", now);
        store.add_spend(&daily, &monthly, 0.2, now).await.unwrap();

        let tomorrow = Utc.with_ymd_and_hms(2025, 6, 22, 1, 0, 0).unwrap();
        // 窗口记录和日花费过期，月花费仍有效
        assert_eq!(store.sweep(tomorrow).await, 2);
        let totals = store.spend_totals(&daily, &monthly, tomorrow).await.unwrap();
        assert_eq!(totals.daily_usd, 0.0);
        assert!((totals.monthly_usd - 0.2).abs() < 1e-9);
    }
}
