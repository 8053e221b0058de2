//! Great-circle math on lon/lat coordinates.
//!
//! Coordinates are stored as `f32` to keep leaves small; every trigonometric
//! step runs in `f64`.

use std::f64::consts::PI;

/// Mean Earth radius used for every distance this crate reports.
pub const EARTH_RADIUS_IN_METERS: f64 = 6_372_797.560856;

pub const LON_MAX: f32 = 180.0;
pub const LON_MIN: f32 = -LON_MAX;
/// Latitudes are capped well short of the poles to limit quadrant distortion.
pub const LAT_MAX: f32 = 85.0;
pub const LAT_MIN: f32 = -LAT_MAX;

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LonLat {
    pub lon: f32,
    pub lat: f32,
}

impl LonLat {
    #[inline]
    pub const fn new(lon: f32, lat: f32) -> Self {
        Self { lon, lat }
    }

    /// Great-circle distance to `other` in meters.
    #[inline]
    pub fn distance_to(&self, other: &LonLat) -> f64 {
        geo_distance(
            self.lon as f64,
            self.lat as f64,
            other.lon as f64,
            other.lat as f64,
        )
    }
}

#[inline]
pub fn deg2rad(deg: f64) -> f64 {
    deg / 180.0 * PI
}

#[inline]
pub fn rad2deg(rad: f64) -> f64 {
    rad / PI * 180.0
}

/// Central angle between two points in radians (haversine).
#[inline]
pub fn geo_angle(lon1d: f64, lat1d: f64, lon2d: f64, lat2d: f64) -> f64 {
    let lat1r = deg2rad(lat1d);
    let lon1r = deg2rad(lon1d);
    let lat2r = deg2rad(lat2d);
    let lon2r = deg2rad(lon2d);
    let u = ((lat2r - lat1r) / 2.0).sin();
    let v = ((lon2r - lon1r) / 2.0).sin();
    // Clamp guards asin against rounding just above 1 for antipodal pairs.
    2.0 * (u * u + lat1r.cos() * lat2r.cos() * v * v).sqrt().min(1.0).asin()
}

/// Great-circle distance between two points in meters.
#[inline]
pub fn geo_distance(lon1d: f64, lat1d: f64, lon2d: f64, lat2d: f64) -> f64 {
    EARTH_RADIUS_IN_METERS * geo_angle(lon1d, lat1d, lon2d, lat2d)
}

/// Rounds half-way values down: `ceil(x - 0.5)`.
#[inline]
pub fn geo_round(flt: f64) -> i32 {
    (flt - 0.5).ceil() as i32
}

/// Signed longitude difference `to - from` wrapped into `[-180, 180]` degrees.
#[inline]
pub fn lon_delta(from: f64, to: f64) -> f64 {
    let mut d = (to - from) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d
}
