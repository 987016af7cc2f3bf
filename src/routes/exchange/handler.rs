use axum::{
    Json,
    extract::{Query, State},
};

use super::model::{DEFAULT_BASE, ExchangeQuery, ExchangeRates, UpstreamRates, fallback_rates};
use crate::{
    AppState,
    upstream::{UpstreamError, fetch_json, require_key},
};

async fn fetch_rates(state: &AppState, base: &str) -> Result<ExchangeRates, UpstreamError> {
    let config = &state.config;
    let api_key = require_key(config.exchange_rate_api_key.as_deref(), "ExchangeRate")?;

    let request = state.http.get(format!(
        "{}/{}/latest/{}",
        config.exchange_rate_base_url, api_key, base
    ));

    let upstream: UpstreamRates = fetch_json(request, config.upstream_timeout()).await?;
    if upstream.result != "success" {
        return Err(UpstreamError::Rejected(
            upstream.error_type.unwrap_or(upstream.result),
        ));
    }
    Ok(upstream.into())
}

#[axum::debug_handler]
pub async fn get_exchange_rates(
    State(state): State<AppState>,
    Query(query): Query<ExchangeQuery>,
) -> Json<ExchangeRates> {
    let base = query
        .base
        .map(|b| b.trim().to_ascii_uppercase())
        .filter(|b| b.len() == 3 && b.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or_else(|| DEFAULT_BASE.to_string());

    match fetch_rates(&state, &base).await {
        Ok(rates) => Json(rates),
        Err(e) if e.is_timeout() => {
            tracing::warn!(
                "Exchange-rate upstream timed out after {:?} for {}, serving fallback",
                state.config.upstream_timeout(),
                base
            );
            Json(fallback_rates(&base))
        }
        Err(e) => {
            tracing::warn!("Exchange-rate upstream unavailable for {}, serving fallback: {}", base, e);
            Json(fallback_rates(&base))
        }
    }
}
