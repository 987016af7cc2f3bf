use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE: &str = "AED";

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    pub base: Option<String>,
}

/// exchangerate-api v6 `latest` 响应
#[derive(Debug, Deserialize)]
pub struct UpstreamRates {
    pub result: String,
    #[serde(default)]
    pub base_code: String,
    #[serde(default)]
    pub conversion_rates: BTreeMap<String, f64>,
    #[serde(default)]
    pub time_last_update_utc: Option<String>,
    #[serde(rename = "error-type", default)]
    pub error_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub last_updated: Option<String>,
    pub fallback: bool,
    pub error: bool,
}

impl From<UpstreamRates> for ExchangeRates {
    fn from(upstream: UpstreamRates) -> Self {
        Self {
            base: upstream.base_code,
            rates: upstream.conversion_rates,
            last_updated: upstream.time_last_update_utc,
            fallback: false,
            error: false,
        }
    }
}

// 1 AED 兑换各币种
const AED_RATES: &[(&str, f64)] = &[
    ("AED", 1.0),
    ("USD", 0.2723),
    ("EUR", 0.2510),
    ("GBP", 0.2144),
    ("INR", 22.68),
    ("PKR", 75.90),
    ("PHP", 15.39),
    ("SAR", 1.0211),
    ("CNY", 1.9700),
    ("JPY", 40.80),
];

/// 静态汇率；基准币种不在表中时退回 AED
pub fn fallback_rates(base: &str) -> ExchangeRates {
    let base_rate = AED_RATES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(base))
        .map(|(code, rate)| (*code, *rate));

    let (base, divisor) = base_rate.unwrap_or((DEFAULT_BASE, 1.0));
    let rates = AED_RATES
        .iter()
        .map(|(code, rate)| (code.to_string(), rate / divisor))
        .collect();

    ExchangeRates {
        base: base.to_string(),
        rates,
        last_updated: None,
        fallback: true,
        error: true,
    }
}
