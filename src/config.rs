//! Configuration loader - YAML manifest + .env settings

use serde::{Deserialize, Serialize};
use std::path::Path;
use anyhow::{Context, Result};

use crate::classify::{ColorSchemes, Mode};

/// Main configuration loaded from map.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Sources,
    /// Delimiter of the property table
    pub delimiter: char,
    /// Mode active when the map first renders
    pub default_mode: Mode,
    pub surface: SurfaceConfig,
    pub colors: ColorSchemes,
}

/// Locations of the four datasets: local paths or http(s) URLs
///
/// Relative paths are resolved against `DATA_DIR`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Sources {
    pub properties: String,
    pub parcels: String,
    /// Tried only when `parcels` fails
    pub parcels_legacy: Option<String>,
    pub subdivisions: String,
    pub addresses: String,
}

/// Startup wait for the render-surface library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Asset under the web directory that must exist before serving
    pub probe: Option<String>,
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
}

/// Deployment settings loaded from .env
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: String,
    pub web_dir: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Sources::default(),
            delimiter: ',',
            default_mode: Mode::Quality,
            surface: SurfaceConfig::default(),
            colors: ColorSchemes::default(),
        }
    }
}

impl Default for Sources {
    fn default() -> Self {
        Self {
            properties: "properties.csv".to_string(),
            parcels: "parcels.geojson".to_string(),
            parcels_legacy: Some("legacy/parcels.geojson".to_string()),
            subdivisions: "subdivisions.geojson".to_string(),
            addresses: "addresses.geojson".to_string(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            probe: None,
            max_attempts: 50,
            poll_interval_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }
}

impl Settings {
    /// Load settings from .env file and the environment
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Settings {
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            web_dir: std::env::var("WEB_DIR").unwrap_or_else(|_| "web".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
        }
    }
}

/// True for http:// and https:// locations
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Resolve a source location against the data directory
pub fn resolve_location(data_dir: &str, location: &str) -> String {
    if is_url(location) || Path::new(location).is_absolute() {
        location.to_string()
    } else {
        Path::new(data_dir).join(location).to_string_lossy().into_owned()
    }
}
