//! Quadrant boxes over lon/lat space.

use crate::config::Window;
use crate::geo::{deg2rad, geo_angle, lon_delta, rad2deg, LonLat, EARTH_RADIUS_IN_METERS};

/// One of the four child quadrants of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NW,
    NE,
    SE,
    SW,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::NW, Quadrant::NE, Quadrant::SE, Quadrant::SW];

    #[inline]
    pub const fn from_halves(north: bool, east: bool) -> Self {
        match (north, east) {
            (true, false) => Quadrant::NW,
            (true, true) => Quadrant::NE,
            (false, true) => Quadrant::SE,
            (false, false) => Quadrant::SW,
        }
    }

    /// Slot index used by inner nodes.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn is_north(self) -> bool {
        matches!(self, Quadrant::NW | Quadrant::NE)
    }

    #[inline]
    pub const fn is_east(self) -> bool {
        matches!(self, Quadrant::NE | Quadrant::SE)
    }
}

/// Axis-aligned lon/lat rectangle, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBox {
    pub w: f32,
    pub e: f32,
    pub n: f32,
    pub s: f32,
}

impl GeoBox {
    pub const fn new(w: f32, e: f32, n: f32, s: f32) -> Self {
        Self { w, e, n, s }
    }

    /// The root box spanning the whole window.
    pub fn from_window(window: &Window) -> Self {
        Self::new(window.lon_min, window.lon_max, window.lat_max, window.lat_min)
    }

    #[inline]
    pub fn mid_lon(&self) -> f32 {
        (self.w + self.e) / 2.0
    }

    #[inline]
    pub fn mid_lat(&self) -> f32 {
        (self.n + self.s) / 2.0
    }

    #[inline]
    pub fn contains(&self, p: LonLat) -> bool {
        self.w <= p.lon && p.lon <= self.e && self.s <= p.lat && p.lat <= self.n
    }

    /// Sub-box for one quadrant, split at the midpoints.
    pub fn bisect(&self, quadrant: Quadrant) -> GeoBox {
        let (w, e) = if quadrant.is_east() {
            (self.mid_lon(), self.e)
        } else {
            (self.w, self.mid_lon())
        };
        let (n, s) = if quadrant.is_north() {
            (self.n, self.mid_lat())
        } else {
            (self.mid_lat(), self.s)
        };
        GeoBox::new(w, e, n, s)
    }

    /// Quadrant containing `p`. Points on a midline go east/north.
    #[inline]
    pub fn locate(&self, p: LonLat) -> Quadrant {
        debug_assert!(self.contains(p), "{p:?} outside {self:?}");
        Quadrant::from_halves(p.lat >= self.mid_lat(), p.lon >= self.mid_lon())
    }

    /// Like [`locate`](Self::locate), and shrinks `self` into that quadrant.
    #[inline]
    pub fn locate_and_shrink(&mut self, p: LonLat) -> Quadrant {
        debug_assert!(self.contains(p), "{p:?} outside {self:?}");
        let we = self.mid_lon();
        let east = p.lon >= we;
        if east {
            self.w = we;
        } else {
            self.e = we;
        }

        let ns = self.mid_lat();
        let north = p.lat >= ns;
        if north {
            self.s = ns;
        } else {
            self.n = ns;
        }

        Quadrant::from_halves(north, east)
    }

    /// Smallest great-circle angle (radians) from `p` to any point of the box.
    pub fn min_angle_to(&self, p: LonLat) -> f64 {
        let (plon, plat) = (p.lon as f64, p.lat as f64);
        let (w, e, n, s) = (self.w as f64, self.e as f64, self.n as f64, self.s as f64);

        if w <= plon && plon <= e {
            // Same meridian is always closest when the longitude is covered.
            return if plat > n {
                deg2rad(plat - n)
            } else if plat < s {
                deg2rad(s - plat)
            } else {
                0.0
            };
        }

        // Outside the longitude span the nearest point lies on a meridian edge.
        meridian_min_angle(plon, plat, w, n, s).min(meridian_min_angle(plon, plat, e, n, s))
    }

    /// Smallest great-circle distance in meters from `p` to the box.
    #[inline]
    pub fn min_distance_to(&self, p: LonLat) -> f64 {
        EARTH_RADIUS_IN_METERS * self.min_angle_to(p)
    }
}

/// Minimum angle from (plon, plat) to the meridian segment at `lon` between `s` and `n`.
fn meridian_min_angle(plon: f64, plat: f64, lon: f64, n: f64, s: f64) -> f64 {
    // cos(angle) along the meridian is a*sin(lat) + b*cos(lat), unimodal in lat.
    let dlon = deg2rad(lon_delta(plon, lon));
    let plat_r = deg2rad(plat);
    let a = plat_r.sin();
    let b = plat_r.cos() * dlon.cos();
    let foot = rad2deg(a.atan2(b)).clamp(s, n);

    [foot, s, n]
        .into_iter()
        .map(|lat| geo_angle(plon, plat, lon, lat))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::geo_distance;

    fn root() -> GeoBox {
        GeoBox::from_window(&Window::default())
    }

    #[test]
    fn test_contains_is_inclusive() {
        let b = GeoBox::new(-10.0, 10.0, 5.0, -5.0);
        assert!(b.contains(LonLat::new(-10.0, 5.0)));
        assert!(b.contains(LonLat::new(10.0, -5.0)));
        assert!(!b.contains(LonLat::new(10.01, 0.0)));
        assert!(!b.contains(LonLat::new(0.0, -5.01)));
    }

    #[test]
    fn test_bisect_covers_parent() {
        let b = root();
        assert_eq!(b.bisect(Quadrant::NW), GeoBox::new(-180.0, 0.0, 85.0, 0.0));
        assert_eq!(b.bisect(Quadrant::NE), GeoBox::new(0.0, 180.0, 85.0, 0.0));
        assert_eq!(b.bisect(Quadrant::SE), GeoBox::new(0.0, 180.0, 0.0, -85.0));
        assert_eq!(b.bisect(Quadrant::SW), GeoBox::new(-180.0, 0.0, 0.0, -85.0));
    }

    #[test]
    fn test_locate_ties_go_north_east() {
        let b = root();
        assert_eq!(b.locate(LonLat::new(0.0, 0.0)), Quadrant::NE);
        assert_eq!(b.locate(LonLat::new(-0.1, 0.0)), Quadrant::NW);
        assert_eq!(b.locate(LonLat::new(0.0, -0.1)), Quadrant::SE);
        assert_eq!(b.locate(LonLat::new(-10.0, -20.0)), Quadrant::SW);
    }

    #[test]
    fn test_locate_and_shrink_matches_bisect() {
        let p = LonLat::new(33.3, -12.7);
        let mut walking = root();
        let mut rebuilt = root();
        for _ in 0..12 {
            let expected = rebuilt.locate(p);
            rebuilt = rebuilt.bisect(expected);
            assert_eq!(walking.locate_and_shrink(p), expected);
            assert_eq!(walking, rebuilt);
            assert!(walking.contains(p));
        }
    }

    #[test]
    fn test_quadrant_halves() {
        for q in Quadrant::ALL {
            assert_eq!(Quadrant::from_halves(q.is_north(), q.is_east()), q);
        }
        assert_eq!(Quadrant::SW.index(), 3);
    }

    #[test]
    fn test_min_distance_inside_and_same_meridian() {
        let b = GeoBox::new(10.0, 20.0, 40.0, 30.0);
        assert_eq!(b.min_distance_to(LonLat::new(15.0, 35.0)), 0.0);
        let north = b.min_distance_to(LonLat::new(15.0, 41.0));
        assert!((north - geo_distance(15.0, 41.0, 15.0, 40.0)).abs() < 1e-6);
    }

    #[test]
    fn test_min_distance_across_antimeridian() {
        let b = GeoBox::new(-180.0, -170.0, 10.0, -10.0);
        let d = b.min_distance_to(LonLat::new(179.0, 0.0));
        assert!((d - geo_distance(179.0, 0.0, 180.0, 0.0)).abs() < 1e-3);
    }

    #[test]
    fn test_min_distance_never_exceeds_samples() {
        // A lower bound must hold against every point of the box.
        let boxes = [
            GeoBox::new(10.0, 20.0, 70.0, 60.0),
            GeoBox::new(-120.0, -100.0, -20.0, -40.0),
            GeoBox::new(150.0, 180.0, 85.0, 80.0),
        ];
        let queries = [
            LonLat::new(0.0, 65.0),
            LonLat::new(40.0, 80.0),
            LonLat::new(-170.0, 84.0),
            LonLat::new(-60.0, -30.0),
            LonLat::new(100.0, -50.0),
        ];
        for b in boxes {
            for q in queries {
                let bound = b.min_distance_to(q);
                for i in 0..=20 {
                    for j in 0..=20 {
                        let lon = b.w + (b.e - b.w) * i as f32 / 20.0;
                        let lat = b.s + (b.n - b.s) * j as f32 / 20.0;
                        let d = LonLat::new(lon, lat).distance_to(&q);
                        assert!(bound <= d + 1e-6, "{b:?} {q:?}: bound {bound} > sample {d}");
                    }
                }
            }
        }
    }
}
