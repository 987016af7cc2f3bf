use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// 带有自然结束时间的计数键（按日 / 按月）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKey {
    pub key: String,
    pub ends_at: DateTime<Utc>,
}

pub fn rate_limit_key(identity: &str, now: DateTime<Utc>) -> String {
    format!("rate_limit:{}:{}", identity, now.format("%Y-%m-%d"))
}

pub fn daily_spend_key(identity: &str, now: DateTime<Utc>) -> PeriodKey {
    let ends_at = now
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    PeriodKey {
        key: format!("spend:daily:{}:{}", identity, now.format("%Y-%m-%d")),
        ends_at,
    }
}

pub fn monthly_spend_key(identity: &str, now: DateTime<Utc>) -> PeriodKey {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let ends_at = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    PeriodKey {
        key: format!("spend:monthly:{}:{}", identity, now.format("%Y-%m")),
        ends_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keys_embed_calendar_period() {
        let now = Utc.with_ymd_and_hms(2025, 6, 21, 15, 30, 0).unwrap();
        assert_eq!(rate_limit_key("ip:1.2.3.4", now), "rate_limit:ip:1.2.3.4:2025-06-21");

        let daily = daily_spend_key("ip:1.2.3.4", now);
        assert_eq!(daily.key, "spend:daily:ip:1.2.3.4:2025-06-21");
        assert_eq!(daily.ends_at, Utc.with_ymd_and_hms(2025, 6, 22, 0, 0, 0).unwrap());

        let monthly = monthly_spend_key("ip:1.2.3.4", now);
        assert_eq!(monthly.key, "spend:monthly:ip:1.2.3.4:2025-06");
        assert_eq!(monthly.ends_at, Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn december_rolls_into_next_year() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            monthly_spend_key("x", now).ends_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            daily_spend_key("x", now).ends_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
