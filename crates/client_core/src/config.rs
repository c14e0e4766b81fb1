use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use shared::domain::Coordinates;
use tracing::warn;
use url::Url;

use crate::{geo::DEFAULT_GEOLOCATION_TIMEOUT, map::{MapConfig, DEFAULT_TILE_URL}};

pub const DEFAULT_SETTINGS_FILE: &str = "dashboard.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSettings {
    pub api_url: String,
    pub map_tile_url: String,
    pub geocoder_url: String,
    pub page_limit: u32,
    pub request_timeout: Duration,
    pub geolocation_timeout: Duration,
    pub device_position: Option<Coordinates>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            map_tile_url: DEFAULT_TILE_URL.into(),
            geocoder_url: "https://nominatim.openstreetmap.org".into(),
            page_limit: 100,
            request_timeout: Duration::from_secs(30),
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            device_position: None,
        }
    }
}

impl DashboardSettings {
    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            tile_url_template: self.map_tile_url.clone(),
            ..MapConfig::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Url::parse(&self.api_url).with_context(|| format!("invalid api url '{}'", self.api_url))?;
        Url::parse(&self.geocoder_url)
            .with_context(|| format!("invalid geocoder url '{}'", self.geocoder_url))?;
        if self.page_limit == 0 {
            anyhow::bail!("page limit must be positive");
        }
        Ok(())
    }
}

/// Defaults, then `dashboard.toml` in the working directory, then the
/// process environment.
pub fn load_settings() -> anyhow::Result<DashboardSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from<F>(file: &Path, env: F) -> anyhow::Result<DashboardSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = DashboardSettings::default();

    if file.exists() {
        let raw = fs::read_to_string(file)
            .with_context(|| format!("failed to read settings file '{}'", file.display()))?;
        let file_cfg = toml::from_str::<HashMap<String, String>>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", file.display()))?;
        apply_overrides(&mut settings, |key| file_cfg.get(key).cloned());
    }

    apply_overrides(&mut settings, |key| {
        env(&key.to_ascii_uppercase()).or_else(|| env(&format!("APP__{}", key.to_ascii_uppercase())))
    });

    settings.validate()?;
    Ok(settings)
}

fn apply_overrides<F>(settings: &mut DashboardSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("api_url") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("map_tile_url") {
        settings.map_tile_url = v;
    }
    if let Some(v) = lookup("geocoder_url") {
        settings.geocoder_url = v;
    }
    if let Some(v) = lookup("page_limit") {
        match v.parse() {
            Ok(parsed) => settings.page_limit = parsed,
            Err(_) => warn!(value = %v, "ignoring unparsable page_limit"),
        }
    }
    if let Some(v) = lookup("request_timeout_seconds") {
        match v.parse() {
            Ok(secs) => settings.request_timeout = Duration::from_secs(secs),
            Err(_) => warn!(value = %v, "ignoring unparsable request_timeout_seconds"),
        }
    }
    if let Some(v) = lookup("geolocation_timeout_seconds") {
        match v.parse() {
            Ok(secs) => settings.geolocation_timeout = Duration::from_secs(secs),
            Err(_) => warn!(value = %v, "ignoring unparsable geolocation_timeout_seconds"),
        }
    }

    let latitude = lookup("device_latitude").and_then(|v| v.parse::<f64>().ok());
    let longitude = lookup("device_longitude").and_then(|v| v.parse::<f64>().ok());
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        let position = Coordinates::new(latitude, longitude);
        if position.is_valid() {
            settings.device_position = Some(position);
        } else {
            warn!(latitude, longitude, "ignoring out-of-range device position");
        }
    }
}
