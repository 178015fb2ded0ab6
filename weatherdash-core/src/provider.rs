use crate::{
    Config, PlaceQuery, WeatherView,
    error::{Error, Result},
    provider::{ipgeolocation::IpGeolocator, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod ipgeolocation;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    IpGeolocation,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::IpGeolocation => "ipgeolocation",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::IpGeolocation]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "ipgeolocation" => Ok(ProviderId::IpGeolocation),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, ipgeolocation."
            )),
        }
    }
}

/// Source of current conditions plus forecast for a place.
///
/// One call is one fresh round trip: no caching, no retries. Either the whole
/// view comes back or an error does.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_conditions(&self, query: &PlaceQuery) -> Result<WeatherView>;
}

/// Construct the weather provider from config. Fails fast when no key is configured.
pub fn weather_provider_from_config(config: &Config) -> Result<Box<dyn WeatherProvider>> {
    let id = ProviderId::OpenWeather;
    let api_key = config
        .provider_api_key(id)
        .ok_or_else(|| missing_api_key(id))?;

    let mut provider = OpenWeatherProvider::new(api_key.to_owned());
    if let Some(url) = config.provider_base_url(id) {
        provider = provider.with_base_url(url);
    }

    Ok(Box::new(provider))
}

pub(crate) fn missing_api_key(id: ProviderId) -> Error {
    Error::Configuration(format!(
        "No API key configured for provider '{id}'.\n\
             Hint: run `weatherdash configure {id}` and enter your API key."
    ))
}

/// Construct the location resolver. Without a key it only ever yields the default location.
pub fn geolocator_from_config(config: &Config) -> IpGeolocator {
    let id = ProviderId::IpGeolocation;
    let mut locator = IpGeolocator::new(config.provider_api_key(id).map(str::to_owned));
    if let Some(url) = config.provider_base_url(id) {
        locator = locator.with_url(url);
    }
    locator
}

/// Shorten a response body for inclusion in an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
