//! Device geolocation and reverse geocoding. Both are best-effort: callers
//! degrade to manual entry on any failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{domain::Coordinates, protocol::ReverseGeocodeResponse};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);
const NOMINATIM_ZOOM: &str = "18";
const GEOCODER_USER_AGENT: &str = concat!("geotag-dashboard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("geolocation is not supported on this device")]
    Unsupported,
    #[error("geolocation permission denied")]
    PermissionDenied,
    #[error("geolocation timed out after {0:?}")]
    Timeout(Duration),
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

pub struct MissingGeolocator;

#[async_trait]
impl Geolocator for MissingGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Reports a position configured up front, for hosts without a positioning API.
pub struct FixedGeolocator {
    position: Coordinates,
}

impl FixedGeolocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        Ok(self.position)
    }
}

/// Asks the geolocator for a position, bounded by `timeout`.
pub async fn acquire_position(
    geolocator: &dyn Geolocator,
    timeout: Duration,
) -> Result<Coordinates, GeolocationError> {
    let position = match tokio::time::timeout(timeout, geolocator.current_position()).await {
        Ok(result) => result?,
        Err(_) => return Err(GeolocationError::Timeout(timeout)),
    };
    if !position.is_valid() {
        return Err(GeolocationError::Unavailable(format!(
            "position out of range: {}",
            position.format(6)
        )));
    }
    Ok(position)
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("invalid geocoder url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("geocoding request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("geocoder returned status {0}")]
    Status(u16),
    #[error("geocoder returned no address")]
    NoAddress,
    #[error("reverse geocoding is unavailable")]
    Unavailable,
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, position: Coordinates) -> Result<String, GeocodeError>;
}

pub struct MissingReverseGeocoder;

#[async_trait]
impl ReverseGeocoder for MissingReverseGeocoder {
    async fn reverse(&self, _position: Coordinates) -> Result<String, GeocodeError> {
        Err(GeocodeError::Unavailable)
    }
}

pub struct NominatimGeocoder {
    http: Client,
    reverse_url: Url,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, GeocodeError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent(GEOCODER_USER_AGENT)
            .build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, GeocodeError> {
        let invalid = |source| GeocodeError::InvalidUrl {
            url: base_url.to_string(),
            source,
        };
        let mut base = Url::parse(base_url.trim()).map_err(invalid)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let reverse_url = base.join("reverse").map_err(invalid)?;
        Ok(Self { http, reverse_url })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, position: Coordinates) -> Result<String, GeocodeError> {
        let lat = position.latitude.to_string();
        let lon = position.longitude.to_string();
        let response = self
            .http
            .get(self.reverse_url.clone())
            .query(&[
                ("format", "json"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", NOMINATIM_ZOOM),
                ("addressdetails", "1"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status().as_u16()));
        }
        let body: ReverseGeocodeResponse = response.json().await?;
        body.display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(GeocodeError::NoAddress)
    }
}

/// Display address for a position, or `"lat, lon"` when the lookup fails.
pub async fn describe_position(geocoder: &dyn ReverseGeocoder, position: Coordinates) -> String {
    match geocoder.reverse(position).await {
        Ok(address) => {
            debug!(%address, "reverse geocoded position");
            address
        }
        Err(err) => {
            warn!("could not get address from coordinates: {err}");
            position.format(6)
        }
    }
}

#[cfg(test)]
#[path = "tests/geo_tests.rs"]
mod tests;
