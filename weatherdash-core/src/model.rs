use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::units::{ClockFormat, TemperatureUnit};

/// How a lookup names its place: free text (city name or ZIP) or a coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceQuery {
    ByName(String),
    ByCoordinates(Coordinates),
}

impl PlaceQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        PlaceQuery::ByName(name.into())
    }

    pub fn by_coordinates(lat: f64, lon: f64) -> Self {
        PlaceQuery::ByCoordinates(Coordinates { lat, lon })
    }

    /// Reject queries that could only produce an empty or nonsensical lookup.
    pub fn validate(&self) -> Result<()> {
        match self {
            PlaceQuery::ByName(name) if name.trim().is_empty() => {
                Err(Error::Configuration("place name must not be empty".to_string()))
            }
            PlaceQuery::ByCoordinates(c) if !c.is_valid() => Err(Error::Configuration(format!(
                "coordinates out of range: lat={}, lon={}",
                c.lat, c.lon
            ))),
            _ => Ok(()),
        }
    }

    /// Query string pairs identifying the place, as the weather endpoints expect them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            PlaceQuery::ByName(name) => vec![("q", name.trim().to_string())],
            PlaceQuery::ByCoordinates(c) => {
                vec![("lat", c.lat.to_string()), ("lon", c.lon.to_string())]
            }
        }
    }
}

impl std::fmt::Display for PlaceQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceQuery::ByName(name) => f.write_str(name),
            PlaceQuery::ByCoordinates(c) => write!(f, "{:.4}, {:.4}", c.lat, c.lon),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Provider condition icon code such as `10d`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Icon(pub String);

impl Icon {
    pub fn url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}.png", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub city: String,
    pub temp_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub feels_like_c: f64,
    pub wind_kmh: f64,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
    pub coordinates: Coordinates,
    /// Shift of the place's local time from UTC, as reported by the provider.
    pub utc_offset_secs: i32,
}

impl CurrentConditions {
    pub fn sunrise_label(&self, clock: ClockFormat) -> String {
        clock.format(&self.sunrise)
    }

    pub fn sunset_label(&self, clock: ClockFormat) -> String {
        clock.format(&self.sunset)
    }

    /// `UTC`, `UTC+05:30`, `UTC-04:00`.
    pub fn timezone_label(&self) -> String {
        timezone_label(self.utc_offset_secs)
    }
}

pub fn timezone_label(offset_secs: i32) -> String {
    if offset_secs == 0 {
        return "UTC".to_string();
    }
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let abs = offset_secs.unsigned_abs();
    format!("UTC{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: DateTime<FixedOffset>,
    pub temp_c: f64,
    pub icon: Icon,
}

/// One day of the weekly outlook.
///
/// `high_c`/`low_c` come from the single 3-hour sample picked for the day,
/// not from an aggregate over the whole day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub day: String,
    pub condition: String,
    pub high_c: f64,
    pub low_c: f64,
    pub icon: Icon,
}

impl ForecastDay {
    /// `25/18` style pair in the requested unit.
    pub fn high_low(&self, unit: TemperatureUnit) -> String {
        format!(
            "{}/{}",
            unit.convert_celsius(self.high_c).round() as i64,
            unit.convert_celsius(self.low_c).round() as i64
        )
    }
}

/// Everything one lookup produces, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherView {
    pub current: CurrentConditions,
    pub hourly: Vec<ForecastPoint>,
    pub daily: Vec<ForecastDay>,
}

/// A registry entry: a frozen snapshot of a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedCity {
    pub name: String,
    pub temp_c: f64,
    pub icon: Option<Icon>,
    pub captured_at: DateTime<Utc>,
    pub timezone: String,
    pub hourly_forecast: Vec<ForecastPoint>,
}

impl SavedCity {
    pub const HOURLY_SNAPSHOT_LEN: usize = 6;

    pub fn from_view(view: &WeatherView, captured_at: DateTime<Utc>) -> Self {
        Self {
            name: view.current.city.clone(),
            temp_c: view.current.temp_c,
            icon: view.hourly.first().map(|p| p.icon.clone()),
            captured_at,
            timezone: view.current.timezone_label(),
            hourly_forecast: view
                .hourly
                .iter()
                .take(Self::HOURLY_SNAPSHOT_LEN)
                .cloned()
                .collect(),
        }
    }
}
