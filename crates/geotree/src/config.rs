//! Tree configuration.

use crate::error::GeoError;
use crate::geo::{LonLat, LAT_MAX, LAT_MIN, LON_MAX, LON_MIN};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TreeConfig {
    /// Maximum entries a leaf holds before it is split.
    #[serde(default = "default_split_threshold")]
    pub split_threshold: u32,
    /// Hard bound on splitting. 16 keeps quadrant edges under ~1 km at the equator.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    /// Valid coordinate window; also the root box.
    #[serde(default)]
    pub window: Window,
}

impl TreeConfig {
    /// Parse a configuration from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, GeoError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeoError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        info!(
            "Loaded tree config from {:?} (split_threshold={}, max_depth={})",
            path, config.split_threshold, config.max_depth
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        if self.split_threshold == 0 {
            return Err(GeoError::InvalidConfig(
                "split_threshold must be positive".to_string(),
            ));
        }
        self.window.validate()
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            split_threshold: default_split_threshold(),
            max_depth: default_max_depth(),
            window: Window::default(),
        }
    }
}

fn default_split_threshold() -> u32 {
    128
}
fn default_max_depth() -> u32 {
    16
}

/// Inclusive lon/lat window of accepted coordinates.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Window {
    #[serde(default = "default_lon_min")]
    pub lon_min: f32,
    #[serde(default = "default_lon_max")]
    pub lon_max: f32,
    #[serde(default = "default_lat_min")]
    pub lat_min: f32,
    #[serde(default = "default_lat_max")]
    pub lat_max: f32,
}

impl Window {
    #[inline]
    pub fn contains(&self, p: LonLat) -> bool {
        self.lon_min <= p.lon
            && p.lon <= self.lon_max
            && self.lat_min <= p.lat
            && p.lat <= self.lat_max
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        let finite = [self.lon_min, self.lon_max, self.lat_min, self.lat_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(GeoError::InvalidConfig("window bounds must be finite".to_string()));
        }
        if self.lon_min >= self.lon_max || self.lat_min >= self.lat_max {
            return Err(GeoError::InvalidConfig(format!(
                "empty window: lon [{}, {}], lat [{}, {}]",
                self.lon_min, self.lon_max, self.lat_min, self.lat_max
            )));
        }
        if self.lon_min < LON_MIN
            || self.lon_max > LON_MAX
            || self.lat_min <= -90.0
            || self.lat_max >= 90.0
        {
            return Err(GeoError::InvalidConfig(
                "window must lie within lon [-180, 180] and lat (-90, 90)".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            lon_min: default_lon_min(),
            lon_max: default_lon_max(),
            lat_min: default_lat_min(),
            lat_max: default_lat_max(),
        }
    }
}

fn default_lon_min() -> f32 {
    LON_MIN
}
fn default_lon_max() -> f32 {
    LON_MAX
}
fn default_lat_min() -> f32 {
    LAT_MIN
}
fn default_lat_max() -> f32 {
    LAT_MAX
}
