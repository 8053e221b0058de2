//! Exact k-nearest-neighbor queries.
//!
//! The query first narrows the search to a nine-box: starting with all nine
//! positions at the root, it keeps stepping one level toward the query point
//! while the next center is an inner node holding at least `k` points. Every
//! entry below the nine distinct nodes becomes a candidate, candidates are
//! ranked by exact great-circle distance and cut to `k`.
//!
//! The nine-box alone only bounds the search for evenly spread points, so the
//! provisional k-th distance is then certified: one walk from the root visits
//! whatever subtrees lie within that distance and were not collected yet.

use super::bounds::{GeoBox, Quadrant};
use super::nine_box::NineBox;
use super::node::Node;
use super::quadtree::GeoTree;
use crate::error::GeoError;
use crate::geo::{geo_round, LonLat};
use std::cmp::Ordering;
use std::hash::Hash;
use tracing::trace;

/// Absolute and relative rounding slack on the certified radius.
const CERTIFY_SLACK_METERS: f64 = 1e-3;
const CERTIFY_SLACK_RELATIVE: f64 = 1e-9;

/// Largest distance the certification walk still has to look at.
#[inline]
fn certify_limit(radius: f64) -> f64 {
    radius + radius * CERTIFY_SLACK_RELATIVE + CERTIFY_SLACK_METERS
}

/// Query flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NearbyOptions {
    /// Return the k nearest in no particular order.
    pub no_sort: bool,
}

impl NearbyOptions {
    pub const SORTED: NearbyOptions = NearbyOptions { no_sort: false };
    pub const UNSORTED: NearbyOptions = NearbyOptions { no_sort: true };
}

/// One query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Nearby<K> {
    pub id: K,
    pub point: LonLat,
    /// Great-circle distance in whole meters, rounded half down.
    pub distance: u32,
}

struct Candidate<'a, K> {
    id: &'a K,
    point: LonLat,
    dist: f64,
}

#[inline]
fn by_dist<K>(a: &Candidate<'_, K>, b: &Candidate<'_, K>) -> Ordering {
    a.dist.total_cmp(&b.dist)
}

/// Keep the `k` closest candidates, unordered.
fn select_k<K>(candidates: &mut Vec<Candidate<'_, K>>, k: usize) {
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, by_dist);
        candidates.truncate(k);
    }
}

/// What the nine-box phase produced, before certification.
#[derive(Debug)]
pub(crate) struct NineBoxScan<'a, K> {
    pub depth: u32,
    pub nodes: Vec<&'a Node<K>>,
    pub entries: Vec<(&'a K, LonLat)>,
}

impl<K: Eq + Hash + Clone> GeoTree<K> {
    /// The `k` points nearest to (lon, lat), closest first unless `options.no_sort`.
    ///
    /// Returns `min(k, size())` hits; empty for `k == 0` or an empty tree.
    pub fn get_nearby(
        &self,
        lon: f32,
        lat: f32,
        k: usize,
        options: NearbyOptions,
    ) -> Result<Vec<Nearby<K>>, GeoError> {
        let q = self.check_point(lon, lat)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let Some(root) = self.root.as_deref() else {
            return Ok(Vec::new());
        };

        let scan = self.nine_box_scan(root, q, k);
        let mut best: Vec<Candidate<'_, K>> = scan
            .entries
            .iter()
            .map(|&(id, point)| Candidate {
                id,
                point,
                dist: point.distance_to(&q),
            })
            .collect();
        select_k(&mut best, k);

        let collected = scan.entries.len();
        let mut extra = 0;
        if collected < self.size() {
            // Nine-box already holds >= k points, so the k-th distance is an upper bound.
            let radius = best.iter().map(|c| c.dist).fold(0.0, f64::max);
            let before = best.len();
            let limit = certify_limit(radius);
            Self::certify(root, self.root_box(), q, limit, &scan.nodes, &mut best);
            extra = best.len() - before;
            if extra > 0 {
                select_k(&mut best, k);
            }
        }

        trace!(
            "nearby k={} depth={} nodes={} candidates={} certified_extra={}",
            k,
            scan.depth,
            scan.nodes.len(),
            collected,
            extra
        );

        if !options.no_sort {
            best.sort_unstable_by(by_dist);
        }

        Ok(best
            .into_iter()
            .map(|c| Nearby {
                id: c.id.clone(),
                point: c.point,
                distance: geo_round(c.dist).max(0) as u32,
            })
            .collect())
    }

    /// Distance in meters to the k-th nearest point, or 0 when fewer than `k` exist.
    pub fn get_nearby_radius_by_count(
        &self,
        lon: f32,
        lat: f32,
        k: usize,
    ) -> Result<u32, GeoError> {
        let nearby = self.get_nearby(lon, lat, k, NearbyOptions::UNSORTED)?;
        if k == 0 || nearby.len() < k {
            return Ok(0);
        }
        Ok(nearby.iter().map(|n| n.distance).max().unwrap_or(0))
    }

    /// Descend the nine-box toward `q` and collect every entry under it.
    pub(crate) fn nine_box_scan<'a>(
        &self,
        root: &'a Node<K>,
        q: LonLat,
        k: usize,
    ) -> NineBoxScan<'a, K> {
        let mut nine = NineBox::at_root(root, self.root_box());
        loop {
            let toward = nine.center_box.locate(q);
            let moved = nine.moved(toward);
            match moved.center() {
                Some(center) if center.count() >= k && !center.is_leaf() => nine = moved,
                _ => break,
            }
        }

        let nodes = nine.distinct();
        let mut entries = Vec::with_capacity(nodes.iter().map(|n| n.count()).sum());
        for &node in &nodes {
            node.collect_into(&mut entries);
        }
        NineBoxScan {
            depth: nine.depth,
            nodes,
            entries,
        }
    }

    /// Add every entry within `limit` of `q` that `skip` did not already cover.
    fn certify<'a>(
        node: &'a Node<K>,
        bbox: GeoBox,
        q: LonLat,
        limit: f64,
        skip: &[&'a Node<K>],
        out: &mut Vec<Candidate<'a, K>>,
    ) {
        if skip.iter().any(|seen| std::ptr::eq(*seen, node)) {
            return;
        }
        if bbox.min_distance_to(q) > limit {
            return;
        }

        match node {
            Node::Leaf(leaf) => {
                for (id, p) in leaf.iter() {
                    let dist = p.distance_to(&q);
                    if dist <= limit {
                        out.push(Candidate { id, point: *p, dist });
                    }
                }
            }
            Node::Inner(inner) => {
                for quadrant in Quadrant::ALL {
                    if let Some(child) = inner.child(quadrant) {
                        Self::certify(child, bbox.bisect(quadrant), q, limit, skip, out);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::geo_distance;

    fn brute_force(tree: &GeoTree<u32>, lon: f32, lat: f32) -> Vec<u32> {
        let q = LonLat::new(lon, lat);
        let mut all: Vec<f64> = tree.iter().map(|(_, p)| p.distance_to(&q)).collect();
        all.sort_by(f64::total_cmp);
        all.into_iter().map(|d| geo_round(d) as u32).collect()
    }

    fn grid_tree(split: u32) -> GeoTree<u32> {
        let mut tree = GeoTree::new(split);
        let mut id = 0;
        for i in 0..40 {
            for j in 0..30 {
                let lon = -150.0 + i as f32 * 7.5;
                let lat = -75.0 + j as f32 * 5.0;
                tree.insert(id, lon, lat).unwrap();
                id += 1;
            }
        }
        tree
    }

    #[test]
    fn test_empty_and_zero_k() {
        let mut tree: GeoTree<u32> = GeoTree::new(3);
        assert!(tree.get_nearby(0.0, 0.0, 5, NearbyOptions::default()).unwrap().is_empty());
        tree.insert(1, 0.0, 0.0).unwrap();
        assert!(tree.get_nearby(0.0, 0.0, 0, NearbyOptions::default()).unwrap().is_empty());
        assert_eq!(tree.get_nearby_radius_by_count(0.0, 0.0, 0).unwrap(), 0);
    }

    #[test]
    fn test_invalid_query_point() {
        let tree: GeoTree<u32> = GeoTree::new(3);
        assert!(matches!(
            tree.get_nearby(0.0, 89.0, 1, NearbyOptions::default()),
            Err(GeoError::InvalidCoordinate { .. })
        ));
        assert!(tree.get_nearby_radius_by_count(-181.0, 0.0, 1).is_err());
    }

    #[test]
    fn test_sorted_hits_carry_points_and_rounded_distance() {
        let mut tree = GeoTree::new(3);
        tree.insert(1u32, -96.809261, 32.770455).unwrap();
        tree.insert(2, -96.3, 32.7).unwrap();
        tree.insert(3, 10.0, 10.0).unwrap();
        tree.insert(4, -97.0, 33.0).unwrap();

        let hits = tree.get_nearby(-96.276111, 32.726386, 2, NearbyOptions::SORTED).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 2);
        assert_eq!(hits[1].id, 1);
        assert_eq!(hits[1].point, LonLat::new(-96.809261, 32.770455));
        let exact = geo_distance(
            -96.276111f32 as f64,
            32.726386f32 as f64,
            -96.809261f32 as f64,
            32.770455f32 as f64,
        );
        assert_eq!(hits[1].distance, geo_round(exact) as u32);
        assert!((hits[1].distance as f64 - 50115.0).abs() <= 5.0);
    }

    #[test]
    fn test_k_larger_than_tree() {
        let tree = grid_tree(8);
        let hits = tree.get_nearby(1.0, 1.0, 5000, NearbyOptions::default()).unwrap();
        assert_eq!(hits.len(), tree.size());
        assert_eq!(tree.get_nearby_radius_by_count(1.0, 1.0, 5000).unwrap(), 0);
    }

    #[test]
    fn test_matches_brute_force_on_grid() {
        let tree = grid_tree(8);
        let queries = [(0.0, 0.0), (-179.0, 84.0), (179.9, -84.9), (33.3, 61.2), (-150.0, -75.0)];
        for (lon, lat) in queries {
            let truth = brute_force(&tree, lon, lat);
            for k in [1, 2, 7, 30, 100, 400] {
                let hits = tree.get_nearby(lon, lat, k, NearbyOptions::SORTED).unwrap();
                let got: Vec<u32> = hits.iter().map(|h| h.distance).collect();
                assert_eq!(got.as_slice(), &truth[..k], "query ({lon}, {lat}) k={k}");
                assert_eq!(
                    tree.get_nearby_radius_by_count(lon, lat, k).unwrap(),
                    *got.last().unwrap()
                );
            }
        }
    }

    #[test]
    fn test_unsorted_returns_same_set() {
        let tree = grid_tree(4);
        let mut sorted = tree.get_nearby(12.0, 40.0, 25, NearbyOptions::SORTED).unwrap();
        let mut unsorted = tree.get_nearby(12.0, 40.0, 25, NearbyOptions::UNSORTED).unwrap();
        sorted.sort_by_key(|h| h.id);
        unsorted.sort_by_key(|h| h.id);
        assert_eq!(sorted, unsorted);
    }

    #[test]
    fn test_nine_box_narrows_search() {
        let tree = grid_tree(4);
        let root = tree.root.as_deref().unwrap();
        let scan = tree.nine_box_scan(root, LonLat::new(0.0, 0.0), 3);
        assert!(scan.depth > 0);
        assert!(scan.entries.len() >= 3);
        assert!(scan.entries.len() < tree.size());
        assert!(scan.nodes.len() <= 9);
    }

    #[test]
    fn test_root_leaf_is_scanned_whole() {
        let mut tree = GeoTree::new(100);
        for id in 0..10u32 {
            tree.insert(id, id as f32, 0.0).unwrap();
        }
        let root = tree.root.as_deref().unwrap();
        let scan = tree.nine_box_scan(root, LonLat::new(0.0, 0.0), 1);
        assert_eq!(scan.depth, 0);
        assert_eq!(scan.nodes.len(), 1);
        assert_eq!(scan.entries.len(), 10);
    }

    #[test]
    fn test_cluster_far_from_nine_box() {
        // One dense cluster pulls the nine-box down; the true nearest lies just outside it.
        let mut tree = GeoTree::new(2);
        let mut id = 0u32;
        for i in 0..10 {
            for j in 0..10 {
                tree.insert(id, 10.0 + i as f32 * 0.01, 60.0 + j as f32 * 0.01).unwrap();
                id += 1;
            }
        }
        tree.insert(1000, 9.99, 60.05).unwrap();
        let hits = tree.get_nearby(10.0, 60.05, 3, NearbyOptions::SORTED).unwrap();
        let truth = brute_force(&tree, 10.0, 60.05);
        let got: Vec<u32> = hits.iter().map(|h| h.distance).collect();
        assert_eq!(got.as_slice(), &truth[..3]);
    }

    #[test]
    fn test_certify_limit_grows_with_radius() {
        assert_eq!(certify_limit(0.0), CERTIFY_SLACK_METERS);
        let half_circumference = std::f64::consts::PI * crate::geo::EARTH_RADIUS_IN_METERS;
        assert!(certify_limit(half_circumference) - half_circumference > 0.02);
    }

    #[test]
    fn test_antipodal_queries_match_brute_force() {
        let mut tree = GeoTree::new(2);
        let mut id = 0u32;
        for (clon, clat) in [(10.0f32, 60.0f32), (-170.0, -59.0), (100.0, 0.0)] {
            for i in 0..6 {
                for j in 0..6 {
                    tree.insert(id, clon + i as f32 * 0.05, clat + j as f32 * 0.05).unwrap();
                    id += 1;
                }
            }
        }
        for (lon, lat) in [(-170.0, -60.0), (10.1, 59.1), (-80.0, 0.1), (10.0, 60.0)] {
            let truth = brute_force(&tree, lon, lat);
            for k in [1, 5, 36, 37, 80, 108] {
                let hits = tree.get_nearby(lon, lat, k, NearbyOptions::SORTED).unwrap();
                let got: Vec<u32> = hits.iter().map(|h| h.distance).collect();
                assert_eq!(got.as_slice(), &truth[..k], "query ({lon}, {lat}) k={k}");
            }
        }
    }
}
