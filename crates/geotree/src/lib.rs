//! Geographic point index with exact k-nearest-neighbor search.
//!
//! Points live in an adaptive quadtree over a lon/lat window. Leaves split into
//! four quadrants when they overflow and empty nodes are pruned on removal.
//! Nearest-neighbor queries bound the search with a 3x3 block of same-depth
//! quadrants around the query, then rank candidates by great-circle distance.

pub mod config;
pub mod error;
pub mod geo;
pub mod shared;
pub mod spatial;

// Re-export commonly used types
pub use config::{TreeConfig, Window};
pub use error::GeoError;
pub use geo::{geo_distance, geo_round, LonLat, EARTH_RADIUS_IN_METERS};
pub use shared::SharedGeoTree;
pub use spatial::{GeoBox, GeoTree, Nearby, NearbyOptions, Quadrant};
