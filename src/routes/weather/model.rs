use serde::{Deserialize, Serialize};

pub const DEFAULT_CITY: &str = "Dubai";

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SunTimes {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub sunrise: i64,
    #[serde(default)]
    pub sunset: i64,
}

/// OpenWeatherMap “当前天气” 结构，附加降级标记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub name: String,
    pub main: MainReadings,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub visibility: Option<i64>,
    #[serde(default)]
    pub sys: SunTimes,
    #[serde(default)]
    pub dt: i64,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub error: bool,
}

/// 上游不可用时返回的迪拜静态天气
pub fn fallback_weather() -> WeatherResponse {
    WeatherResponse {
        name: DEFAULT_CITY.to_string(),
        main: MainReadings {
            temp: 32.0,
            feels_like: 36.0,
            temp_min: 29.0,
            temp_max: 35.0,
            humidity: 55.0,
            pressure: 1008.0,
        },
        weather: vec![Condition {
            id: 800,
            main: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
        }],
        wind: Wind {
            speed: 4.1,
            deg: 320.0,
        },
        visibility: Some(10000),
        sys: SunTimes {
            country: "AE".into(),
            sunrise: 0,
            sunset: 0,
        },
        dt: chrono::Utc::now().timestamp(),
        fallback: true,
        error: true,
    }
}
