use axum::{
    Json,
    extract::{Query, State},
};

use super::model::{DEFAULT_CITY, WeatherQuery, WeatherResponse, fallback_weather};
use crate::{
    AppState,
    upstream::{UpstreamError, fetch_json, require_key},
};

async fn fetch_weather(state: &AppState, city: &str) -> Result<WeatherResponse, UpstreamError> {
    let config = &state.config;
    let api_key = require_key(config.openweather_api_key.as_deref(), "OpenWeather")?;

    let request = state
        .http
        .get(format!("{}/weather", config.openweather_base_url))
        .query(&[
            ("q", format!("{},AE", city)),
            ("units", "metric".to_string()),
            ("appid", api_key.to_string()),
        ]);

    let mut weather: WeatherResponse = fetch_json(request, config.upstream_timeout()).await?;
    weather.fallback = false;
    weather.error = false;
    Ok(weather)
}

/// 始终返回 200；降级时 body 中 fallback = true
#[axum::debug_handler]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Json<WeatherResponse> {
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CITY);

    match fetch_weather(&state, city).await {
        Ok(weather) => Json(weather),
        Err(e) if e.is_timeout() => {
            tracing::warn!(
                "Weather upstream timed out after {:?} for {}, serving fallback",
                state.config.upstream_timeout(),
                city
            );
            Json(fallback_weather())
        }
        Err(e) => {
            tracing::warn!("Weather upstream unavailable for {}, serving fallback: {}", city, e);
            Json(fallback_weather())
        }
    }
}
