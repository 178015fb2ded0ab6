use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    store::{SETTINGS_KEY, Store},
    units::{ClockFormat, TemperatureUnit, WindSpeedUnit},
};

/// Display preferences. Read at render time, never applied to fetched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    pub temperature_unit: TemperatureUnit,
    pub wind_speed_unit: WindSpeedUnit,
    pub clock: ClockFormat,
}

/// On-disk shape. Each field falls back to its default independently.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    temperature_unit: Option<TemperatureUnit>,
    #[serde(default)]
    wind_speed_unit: Option<WindSpeedUnit>,
    #[serde(default, rename = "is12HourTime")]
    is_12_hour_time: Option<bool>,
}

impl From<StoredSettings> for Settings {
    fn from(s: StoredSettings) -> Self {
        Self {
            temperature_unit: s.temperature_unit.unwrap_or_default(),
            wind_speed_unit: s.wind_speed_unit.unwrap_or_default(),
            clock: s.is_12_hour_time.map(ClockFormat::from_12_hour).unwrap_or_default(),
        }
    }
}

impl From<&Settings> for StoredSettings {
    fn from(s: &Settings) -> Self {
        Self {
            temperature_unit: Some(s.temperature_unit),
            wind_speed_unit: Some(s.wind_speed_unit),
            is_12_hour_time: Some(s.clock.is_12_hour()),
        }
    }
}

impl Settings {
    /// Load stored preferences, or defaults when none (or unreadable ones) are stored.
    pub fn load(store: &Store) -> Self {
        match store.get::<StoredSettings>(SETTINGS_KEY) {
            Ok(Some(stored)) => stored.into(),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &Store) -> Result<()> {
        store.set(SETTINGS_KEY, &StoredSettings::from(self))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
