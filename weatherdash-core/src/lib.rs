//! Core library for the `weatherdash` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather aggregator and IP geolocation resolver
//! - Saved cities, kept in sync across open instances
//! - Display preferences and unit conversion
//!
//! It is used by `weatherdash-cli`, but can also back other front ends.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod provider;
pub mod registry;
pub mod settings;
pub mod store;
pub mod units;

pub use config::{Config, ProviderConfig};
pub use dashboard::{Dashboard, SearchOutcome};
pub use error::{Error, Result, ValidationError};
pub use model::{
    Coordinates, CurrentConditions, ForecastDay, ForecastPoint, Icon, PlaceQuery, SavedCity,
    WeatherView,
};
pub use provider::{
    ProviderId, WeatherProvider,
    ipgeolocation::{IpGeolocator, ResolvedLocation},
};
pub use registry::{AddOutcome, CityRegistry, MAX_CITIES, SyncBus, SyncMessage};
pub use settings::Settings;
pub use store::Store;
pub use units::{ClockFormat, TemperatureUnit, WindSpeedUnit};
