//! Error types for the geo index.

use thiserror::Error;

/// Errors returned by the tree and its configuration.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Coordinate out of range: lon={lon}, lat={lat}")]
    InvalidCoordinate { lon: f32, lat: f32 },

    #[error("Id not found")]
    NotFound,

    #[error("Invalid tree configuration: {0}")]
    InvalidConfig(String),

    /// Only reported by [`GeoTree::verify`](crate::GeoTree::verify).
    #[error("Tree invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
