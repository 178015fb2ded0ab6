//! Display-time unit conversion.
//!
//! Providers report metric values (Celsius, km/h). Nothing in the fetch path
//! converts; views call into these helpers when rendering.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "Celsius",
            TemperatureUnit::Fahrenheit => "Fahrenheit",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Convert a Celsius reading into this unit.
    pub fn convert_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// Convert a reading in this unit back to Celsius.
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    /// Whole-degree label used by live views, e.g. `68°F`.
    pub fn format(&self, celsius: f64) -> String {
        format!("{}{}", self.convert_celsius(celsius).round() as i64, self.symbol())
    }

    /// One-decimal label used for saved city snapshots, e.g. `20.5°C`.
    pub fn format_precise(&self, celsius: f64) -> String {
        format!("{:.1}{}", self.convert_celsius(celsius), self.symbol())
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!(
                "Unknown temperature unit '{value}'. Supported units: celsius, fahrenheit."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindSpeedUnit {
    #[default]
    #[serde(rename = "km/h")]
    KmPerHour,
    #[serde(rename = "m/s")]
    MetersPerSecond,
    #[serde(rename = "Knots")]
    Knots,
}

impl WindSpeedUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindSpeedUnit::KmPerHour => "km/h",
            WindSpeedUnit::MetersPerSecond => "m/s",
            WindSpeedUnit::Knots => "Knots",
        }
    }

    pub fn convert_kmh(self, kmh: f64) -> f64 {
        match self {
            WindSpeedUnit::KmPerHour => kmh,
            WindSpeedUnit::MetersPerSecond => kmh / 3.6,
            WindSpeedUnit::Knots => kmh / 1.852,
        }
    }

    /// km/h is shown as reported; converted units get one decimal.
    pub fn format(&self, kmh: f64) -> String {
        match self {
            WindSpeedUnit::KmPerHour => format!("{kmh} km/h"),
            other => format!("{:.1} {}", other.convert_kmh(kmh), other.as_str()),
        }
    }
}

impl std::fmt::Display for WindSpeedUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WindSpeedUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "km/h" | "kmh" | "kph" => Ok(WindSpeedUnit::KmPerHour),
            "m/s" | "ms" | "mps" => Ok(WindSpeedUnit::MetersPerSecond),
            "knots" | "kn" | "kt" => Ok(WindSpeedUnit::Knots),
            _ => Err(anyhow::anyhow!(
                "Unknown wind speed unit '{value}'. Supported units: km/h, m/s, knots."
            )),
        }
    }
}

/// 12- or 24-hour clock. Persisted as the `is12HourTime` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockFormat {
    #[default]
    TwelveHour,
    TwentyFourHour,
}

impl ClockFormat {
    pub fn is_12_hour(&self) -> bool {
        matches!(self, ClockFormat::TwelveHour)
    }

    pub fn from_12_hour(flag: bool) -> Self {
        if flag {
            ClockFormat::TwelveHour
        } else {
            ClockFormat::TwentyFourHour
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            ClockFormat::TwelveHour => "%I:%M %p",
            ClockFormat::TwentyFourHour => "%H:%M",
        }
    }

    pub fn format<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        time.format(self.pattern()).to_string()
    }
}

impl TryFrom<&str> for ClockFormat {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "12" | "12h" => Ok(ClockFormat::TwelveHour),
            "24" | "24h" => Ok(ClockFormat::TwentyFourHour),
            _ => Err(anyhow::anyhow!(
                "Unknown clock format '{value}'. Supported formats: 12h, 24h."
            )),
        }
    }
}

impl std::fmt::Display for ClockFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockFormat::TwelveHour => f.write_str("12h"),
            ClockFormat::TwentyFourHour => f.write_str("24h"),
        }
    }
}
