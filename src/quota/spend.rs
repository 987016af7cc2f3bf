use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    LimitUsage, QuotaError, QuotaStore, SpendDecision, SpendLimits,
    keys::{daily_spend_key, monthly_spend_key},
};

/// 未知模型的默认单价（美元 / 千 token）
pub const DEFAULT_PRICE_PER_1K: f64 = 0.002;

// 美元 / 千 token
const MODEL_PRICES: &[(&str, f64)] = &[
    ("openai/gpt-4o", 0.005),
    ("openai/gpt-4o-mini", 0.00015),
    ("openai/gpt-4-turbo", 0.01),
    ("openai/gpt-3.5-turbo", 0.0015),
    ("anthropic/claude-3.5-sonnet", 0.003),
    ("anthropic/claude-3-haiku", 0.00025),
    ("anthropic/claude-3-opus", 0.015),
    ("google/gemini-pro-1.5", 0.0025),
    ("google/gemini-flash-1.5", 0.000075),
    ("meta-llama/llama-3.1-70b-instruct", 0.00052),
    ("mistralai/mistral-large", 0.002),
];

pub fn price_per_thousand(model: &str) -> f64 {
    MODEL_PRICES
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_PRICE_PER_1K)
}

pub fn cost_for(model: &str, tokens: u64) -> f64 {
    tokens as f64 / 1000.0 * price_per_thousand(model)
}

/// 粗略估算：每 4 个字符约 1 个 token
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[derive(Debug, Clone, Copy)]
pub struct SpendUsage {
    pub daily: LimitUsage,
    pub monthly: LimitUsage,
}

/// 按调用方统计的日 / 月花费上限
#[derive(Clone)]
pub struct SpendTracker {
    store: Arc<dyn QuotaStore>,
    limits: SpendLimits,
}

impl SpendTracker {
    pub fn new(store: Arc<dyn QuotaStore>, limits: SpendLimits) -> Self {
        Self { store, limits }
    }

    pub async fn track_cost(
        &self,
        identity: &str,
        model: &str,
        tokens: u64,
    ) -> Result<SpendDecision, QuotaError> {
        self.track_cost_at(identity, model, tokens, Utc::now()).await
    }

    pub async fn track_cost_at(
        &self,
        identity: &str,
        model: &str,
        tokens: u64,
        now: DateTime<Utc>,
    ) -> Result<SpendDecision, QuotaError> {
        let cost_usd = cost_for(model, tokens);
        let daily = daily_spend_key(identity, now);
        let monthly = monthly_spend_key(identity, now);

        let outcome = self
            .store
            .try_spend(&daily, &monthly, cost_usd, self.limits, now)
            .await?;

        if !outcome.accepted {
            tracing::warn!(
                "Spend limit exceeded for {}: cost ${:.6}, daily ${:.4}/{:.2}, monthly ${:.4}/{:.2}",
                identity,
                cost_usd,
                outcome.totals.daily_usd,
                self.limits.daily_usd,
                outcome.totals.monthly_usd,
                self.limits.monthly_usd
            );
        }

        Ok(SpendDecision {
            allowed: outcome.accepted,
            cost_usd,
            daily: LimitUsage::new(outcome.totals.daily_usd, self.limits.daily_usd, daily.ends_at),
            monthly: LimitUsage::new(
                outcome.totals.monthly_usd,
                self.limits.monthly_usd,
                monthly.ends_at,
            ),
        })
    }

    /// 上游返回实际用量后对账：只补记超出预估的部分，预估偏高时不退回
    pub async fn reconcile(
        &self,
        identity: &str,
        model: &str,
        estimated_tokens: u64,
        actual_tokens: u64,
    ) -> Result<f64, QuotaError> {
        self.reconcile_at(identity, model, estimated_tokens, actual_tokens, Utc::now())
            .await
    }

    pub async fn reconcile_at(
        &self,
        identity: &str,
        model: &str,
        estimated_tokens: u64,
        actual_tokens: u64,
        now: DateTime<Utc>,
    ) -> Result<f64, QuotaError> {
        let extra_tokens = actual_tokens.saturating_sub(estimated_tokens);
        if extra_tokens == 0 {
            return Ok(0.0);
        }

        let extra_usd = cost_for(model, extra_tokens);
        let daily = daily_spend_key(identity, now);
        let monthly = monthly_spend_key(identity, now);
        self.store
            .add_spend(&daily, &monthly, extra_usd, now)
            .await?;

        tracing::debug!(
            "Reconciled {} extra tokens (${:.6}) for {}",
            extra_tokens,
            extra_usd,
            identity
        );
        Ok(extra_usd)
    }

    pub async fn usage(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<SpendUsage, QuotaError> {
        let daily = daily_spend_key(identity, now);
        let monthly = monthly_spend_key(identity, now);
        let totals = self.store.spend_totals(&daily, &monthly, now).await?;

        Ok(SpendUsage {
            daily: LimitUsage::new(totals.daily_usd, self.limits.daily_usd, daily.ends_at),
            monthly: LimitUsage::new(totals.monthly_usd, self.limits.monthly_usd, monthly.ends_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::MemoryQuotaStore;
    use chrono::TimeZone;

    fn tracker(daily: f64, monthly: f64) -> SpendTracker {
        SpendTracker::new(
            Arc::new(MemoryQuotaStore::default()),
            SpendLimits {
                daily_usd: daily,
                monthly_usd: monthly,
            },
        )
    }

    #[test]
    fn cost_uses_model_price_or_default() {
        assert!((cost_for("openai/gpt-4o", 2000) - 0.01).abs() < 1e-12);
        assert!((cost_for("some/unknown-model", 1000) - DEFAULT_PRICE_PER_1K).abs() < 1e-12);
        assert_eq!(cost_for("openai/gpt-4o", 0), 0.0);
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[tokio::test]
    async fn accepted_spend_never_exceeds_daily_ceiling() {
        let tracker = tracker(0.055, 100.0);
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap();

        let mut accepted = 0;
        for _ in 0..20 {
            // 每次 0.01 美元
            let d = tracker
                .track_cost_at("caller", "openai/gpt-4-turbo", 1000, now)
                .await
                .unwrap();
            if d.allowed {
                accepted += 1;
                assert!(d.daily.spent_usd <= 0.055);
            }
        }
        assert_eq!(accepted, 5);
    }

    #[tokio::test]
    async fn exhausted_month_rejects_any_positive_cost() {
        let tracker = tracker(10.0, 0.02);
        let day1 = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2025, 5, 2, 9, 0, 0).unwrap();

        let d = tracker
            .track_cost_at("caller", "openai/gpt-4-turbo", 2000, day1)
            .await
            .unwrap();
        assert!(d.allowed);

        let d = tracker
            .track_cost_at("caller", "openai/gpt-4-turbo", 1, day2)
            .await
            .unwrap();
        assert!(!d.allowed);
        assert_eq!(d.daily.spent_usd, 0.0);
        assert!(d.monthly.remaining_usd < 1e-9);
    }

    #[tokio::test]
    async fn reconcile_only_adds_positive_difference() {
        let tracker = tracker(10.0, 100.0);
        let now = Utc.with_ymd_and_hms(2025, 5, 10, 9, 0, 0).unwrap();

        tracker
            .track_cost_at("caller", "openai/gpt-4-turbo", 100, now)
            .await
            .unwrap();
        assert_eq!(
            tracker
                .reconcile_at("caller", "openai/gpt-4-turbo", 100, 80, now)
                .await
                .unwrap(),
            0.0
        );
        let extra = tracker
            .reconcile_at("caller", "openai/gpt-4-turbo", 100, 300, now)
            .await
            .unwrap();
        assert!((extra - 0.002).abs() < 1e-12);

        let usage = tracker.usage("caller", now).await.unwrap();
        // 100 预估 + 200 补记 = 300 token
        assert!((usage.daily.spent_usd - 0.003).abs() < 1e-12);
        assert!((usage.monthly.spent_usd - 0.003).abs() < 1e-12);
    }
}
