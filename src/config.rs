//! Dashboard configuration.
//!
//! Loaded from a TOML file; every section and key is optional and falls back
//! to the defaults below. Values are validated after parsing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::NumericAttr;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Where listings come from and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Listings file (`.csv`, `.json`, `.parquet`).
    pub path: Option<PathBuf>,
    /// Give up on the initial load after this many seconds.
    pub load_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            load_timeout_secs: 10,
        }
    }
}

impl DataConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of filtered views kept; 0 disables caching.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 32 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub price_bins: usize,
    pub review_score_bins: usize,
    /// Columns plotted in the availability chart.
    pub availability: Vec<NumericAttr>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            price_bins: 50,
            review_score_bins: 20,
            availability: vec![
                NumericAttr::Availability30,
                NumericAttr::Availability60,
                NumericAttr::Availability90,
                NumericAttr::Availability365,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapStyle {
    #[default]
    Light,
    Dark,
}

/// Map projection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Point radius is `price / radius_divisor` before clamping.
    pub radius_divisor: f64,
    pub min_radius_pixels: f64,
    pub max_radius_pixels: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub style: MapStyle,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            radius_divisor: 10.0,
            min_radius_pixels: 1.0,
            max_radius_pixels: 100.0,
            zoom: 11.0,
            pitch: 0.0,
            style: MapStyle::Light,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub charts: ChartConfig,
    pub map: MapConfig,
}

impl DashboardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            })
        };
        if self.data.load_timeout_secs == 0 {
            return invalid("data.load_timeout_secs", "must be at least 1");
        }
        let map = &self.map;
        if !(map.radius_divisor.is_finite() && map.radius_divisor > 0.0) {
            return invalid("map.radius_divisor", "must be a positive number");
        }
        if !(map.min_radius_pixels.is_finite() && map.min_radius_pixels >= 0.0) {
            return invalid("map.min_radius_pixels", "must be a non-negative number");
        }
        if !(map.max_radius_pixels.is_finite() && map.max_radius_pixels >= map.min_radius_pixels) {
            return invalid(
                "map.max_radius_pixels",
                "must be a number no smaller than map.min_radius_pixels",
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_toml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.data.load_timeout(), Duration::from_secs(10));
        assert_eq!(config.charts.price_bins, 50);
        assert_eq!(config.charts.review_score_bins, 20);
        assert_eq!(config.map.max_radius_pixels, 100.0);
    }

    #[test]
    fn test_partial_override() {
        let config = DashboardConfig::from_toml_str(
            r#"
            [data]
            path = "listings.parquet"

            [map]
            style = "dark"
            max_radius_pixels = 40.0

            [charts]
            availability = ["availability_30", "availability_365"]
            "#,
        )
        .unwrap();
        assert_eq!(config.data.path, Some(PathBuf::from("listings.parquet")));
        assert_eq!(config.map.style, MapStyle::Dark);
        assert_eq!(config.map.max_radius_pixels, 40.0);
        assert_eq!(config.map.min_radius_pixels, 1.0);
        assert_eq!(
            config.charts.availability,
            vec![NumericAttr::Availability30, NumericAttr::Availability365]
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = DashboardConfig::from_toml_str("[map]\nmin_radius_pixels = 50.0\nmax_radius_pixels = 10.0")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "map.max_radius_pixels"));

        let err = DashboardConfig::from_toml_str("[map]\nradius_divisor = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = DashboardConfig::from_toml_str("[charts]\navailability = [\"availability_7\"]")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
