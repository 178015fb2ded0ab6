use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::{Error, Result},
    model::{
        Coordinates, CurrentConditions, ForecastDay, ForecastPoint, Icon, PlaceQuery, WeatherView,
    },
};

use super::{WeatherProvider, truncate_body};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Points kept for the hourly strip.
pub const HOURLY_POINTS: usize = 6;
/// 3-hour samples per day; the daily outlook keeps one of every this many.
pub const SAMPLES_PER_DAY: usize = 8;
pub const MAX_DAYS: usize = 7;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        label: &str,
        query: &PlaceQuery,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!("GET {} ({}) for {}", url, label, query);

        let mut params = query.query_pairs();
        params.push(("units", "metric".to_string()));
        params.push(("appid", self.api_key.clone()));

        let res = self.http.get(&url).query(&params).send().await.map_err(|e| {
            Error::Provider(format!("Failed to send request to OpenWeather ({label}): {e}"))
        })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            Error::Provider(format!("Failed to read OpenWeather {label} response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(Error::Provider(format!(
                "OpenWeather {} request failed with status {}: {}",
                label,
                status,
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse OpenWeather {label} JSON: {e}")))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch_conditions(&self, query: &PlaceQuery) -> Result<WeatherView> {
        query.validate()?;

        let (current, forecast) = tokio::try_join!(
            self.get_json::<OwCurrentResponse>("weather", "current weather", query),
            self.get_json::<OwForecastResponse>("forecast", "5-day forecast", query),
        )?;

        build_view(current, forecast)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    wind: OwWind,
    sys: OwSys,
    coord: OwCoord,
    /// Seconds east of UTC.
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

impl OwForecastEntry {
    fn primary_weather(&self) -> Result<&OwWeather> {
        self.weather.first().ok_or_else(|| {
            Error::Provider(format!(
                "OpenWeather forecast entry at {} has no weather condition",
                self.dt
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn build_view(current: OwCurrentResponse, forecast: OwForecastResponse) -> Result<WeatherView> {
    let offset = FixedOffset::east_opt(current.timezone).ok_or_else(|| {
        Error::Provider(format!("OpenWeather returned invalid UTC offset {}", current.timezone))
    })?;

    let hourly = hourly_series(&forecast.list, offset)?;
    let daily = daily_series(&forecast.list, offset)?;

    let current = CurrentConditions {
        city: current.name,
        temp_c: current.main.temp,
        temp_min_c: current.main.temp_min,
        temp_max_c: current.main.temp_max,
        feels_like_c: current.main.feels_like,
        wind_kmh: current.wind.speed,
        sunrise: local_time(current.sys.sunrise, offset)?,
        sunset: local_time(current.sys.sunset, offset)?,
        coordinates: Coordinates {
            lat: current.coord.lat,
            lon: current.coord.lon,
        },
        utc_offset_secs: current.timezone,
    };

    Ok(WeatherView {
        current,
        hourly,
        daily,
    })
}

/// First few 3-hour samples, in provider order.
fn hourly_series(list: &[OwForecastEntry], offset: FixedOffset) -> Result<Vec<ForecastPoint>> {
    list.iter()
        .take(HOURLY_POINTS)
        .map(|entry| {
            Ok(ForecastPoint {
                time: local_time(entry.dt, offset)?,
                temp_c: entry.main.temp,
                icon: Icon(entry.primary_weather()?.icon.clone()),
            })
        })
        .collect()
}

/// One sample per day: indices 0, 8, 16, ... The high/low shown for a day is
/// that single sample's min/max, which is narrower than the true daily range.
fn daily_series(list: &[OwForecastEntry], offset: FixedOffset) -> Result<Vec<ForecastDay>> {
    list.iter()
        .step_by(SAMPLES_PER_DAY)
        .take(MAX_DAYS)
        .map(|entry| {
            let weather = entry.primary_weather()?;
            Ok(ForecastDay {
                day: local_time(entry.dt, offset)?.format("%a").to_string(),
                condition: weather.main.clone(),
                high_c: entry.main.temp_max,
                low_c: entry.main.temp_min,
                icon: Icon(weather.icon.clone()),
            })
        })
        .collect()
}

fn local_time(ts: i64, offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    DateTime::from_timestamp(ts, 0)
        .map(|utc| utc.with_timezone(&offset))
        .ok_or_else(|| Error::Provider(format!("OpenWeather returned invalid timestamp {ts}")))
}
