//! Approximate location of the caller from their IP address.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::Coordinates,
};

use super::truncate_body;

pub const DEFAULT_URL: &str = "https://api.ipgeolocation.io/ipgeo";

/// Where lookups land when the caller cannot be located.
/// This is a fixed placeholder, not the caller's position.
pub const DEFAULT_CITY: &str = "Coimbatore";
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    lat: 11.0168,
    lon: 76.9858,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub city: String,
    pub coordinates: Coordinates,
    /// True when this is the default location rather than a resolved one.
    pub is_fallback: bool,
}

impl ResolvedLocation {
    pub fn fallback() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
            coordinates: DEFAULT_COORDINATES,
            is_fallback: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IpGeolocator {
    api_key: Option<String>,
    url: String,
    http: Client,
}

/// The service sends coordinates as strings; accept numbers as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Degrees {
    Number(f64),
    Text(String),
}

impl Degrees {
    fn value(&self) -> Option<f64> {
        match self {
            Degrees::Number(n) => Some(*n),
            Degrees::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpGeoResponse {
    #[serde(default)]
    city: String,
    latitude: Degrees,
    longitude: Degrees,
}

impl IpGeolocator {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            url: DEFAULT_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    /// Locate the caller. Never fails: any problem yields [`ResolvedLocation::fallback`].
    pub async fn resolve_location(&self) -> ResolvedLocation {
        match self.try_resolve().await {
            Ok(location) => {
                tracing::info!(
                    "Resolved location: {} ({}, {})",
                    location.city,
                    location.coordinates.lat,
                    location.coordinates.lon
                );
                location
            }
            Err(e) => {
                tracing::warn!("Geolocation failed, using default location {}: {}", DEFAULT_CITY, e);
                ResolvedLocation::fallback()
            }
        }
    }

    async fn try_resolve(&self) -> Result<ResolvedLocation> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration("No API key configured for provider 'ipgeolocation'".to_string())
        })?;

        let res = self
            .http
            .get(&self.url)
            .query(&[("apiKey", api_key)])
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Failed to send geolocation request: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| Error::Provider(format!("Failed to read geolocation response body: {e}")))?;

        if !status.is_success() {
            return Err(Error::Provider(format!(
                "Geolocation request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let parsed: IpGeoResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Provider(format!("Failed to parse geolocation JSON: {e}")))?;

        let coordinates = match (parsed.latitude.value(), parsed.longitude.value()) {
            (Some(lat), Some(lon)) => Coordinates { lat, lon },
            _ => {
                return Err(Error::Provider(
                    "Geolocation response had unreadable coordinates".to_string(),
                ));
            }
        };
        if !coordinates.is_valid() {
            return Err(Error::Provider(format!(
                "Geolocation returned out-of-range coordinates {}, {}",
                coordinates.lat, coordinates.lon
            )));
        }

        Ok(ResolvedLocation {
            city: parsed.city,
            coordinates,
            is_fallback: false,
        })
    }
}
