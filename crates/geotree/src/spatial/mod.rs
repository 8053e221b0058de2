//! Spatial indexing over lon/lat points.
//!
//! An adaptive quadtree with a nine-box nearest-neighbor search.

mod bounds;
mod nearby;
mod nine_box;
mod node;
mod quadtree;

pub use bounds::{GeoBox, Quadrant};
pub use nearby::{Nearby, NearbyOptions};
pub use quadtree::GeoTree;
