//! Quadtree over lon/lat points.
//!
//! Leaves hold up to `split_threshold` entries and split into four quadrant
//! children when they overflow, unless `max_depth` has been reached. An
//! authoritative id -> point map sits beside the tree so existence checks and
//! moves never need a subtree scan.

use super::bounds::GeoBox;
use super::node::Node;
use crate::config::{TreeConfig, Window};
use crate::error::GeoError;
use crate::geo::LonLat;
use std::collections::HashMap;
use std::hash::Hash;
use tracing::{debug, warn};

/// Splitting limits threaded through the recursive insert.
#[derive(Debug, Clone, Copy)]
struct SplitPolicy {
    threshold: usize,
    max_depth: u32,
}

/// Point index answering exact k-nearest-neighbor queries.
///
/// Not internally synchronized; see [`SharedGeoTree`](crate::SharedGeoTree).
#[derive(Debug)]
pub struct GeoTree<K> {
    pub(crate) root: Option<Box<Node<K>>>,
    /// Single source of truth for "does id exist" and "where is it".
    pub(crate) geos: HashMap<K, LonLat>,
    pub(crate) window: Window,
    policy: SplitPolicy,
}

impl<K: Eq + Hash + Clone> GeoTree<K> {
    /// Tree over the default window with a max depth of 16. A zero threshold is treated as 1.
    pub fn new(split_threshold: u32) -> Self {
        Self::with_max_depth(split_threshold, TreeConfig::default().max_depth)
    }

    pub fn with_max_depth(split_threshold: u32, max_depth: u32) -> Self {
        Self {
            root: None,
            geos: HashMap::new(),
            window: Window::default(),
            policy: SplitPolicy {
                threshold: split_threshold.max(1) as usize,
                max_depth,
            },
        }
    }

    pub fn with_config(config: &TreeConfig) -> Result<Self, GeoError> {
        config.validate()?;
        let mut tree = Self::with_max_depth(config.split_threshold, config.max_depth);
        tree.window = config.window;
        Ok(tree)
    }

    #[inline]
    pub fn split_threshold(&self) -> usize {
        self.policy.threshold
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.policy.max_depth
    }

    #[inline]
    pub fn window(&self) -> &Window {
        &self.window
    }

    #[inline]
    pub(crate) fn root_box(&self) -> GeoBox {
        GeoBox::from_window(&self.window)
    }

    /// Whether (lon, lat) is inside the accepted window.
    #[inline]
    pub fn is_valid(&self, lon: f32, lat: f32) -> bool {
        self.window.contains(LonLat::new(lon, lat))
    }

    pub(crate) fn check_point(&self, lon: f32, lat: f32) -> Result<LonLat, GeoError> {
        if self.is_valid(lon, lat) {
            Ok(LonLat::new(lon, lat))
        } else {
            Err(GeoError::InvalidCoordinate { lon, lat })
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        debug_assert_eq!(self.geos.len(), self.root.as_ref().map_or(0, |r| r.count()));
        self.geos.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.geos.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &K) -> bool {
        self.geos.contains_key(id)
    }

    /// Current position of `id`.
    #[inline]
    pub fn get(&self, id: &K) -> Option<LonLat> {
        self.geos.get(id).copied()
    }

    /// All (id, point) pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &LonLat)> {
        self.geos.iter()
    }

    /// Aggregate count stored at the root (0 when empty).
    #[inline]
    pub fn root_count(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.count())
    }

    pub fn depth(&self) -> u32 {
        self.root.as_ref().map_or(0, |r| r.depth())
    }

    pub fn leaf_count(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.leaf_count())
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.geos.clear();
    }

    /// Insert `id` at (lon, lat), or move it there if it already exists.
    ///
    /// Returns `true` for a new id and `false` for a move.
    pub fn insert(&mut self, id: K, lon: f32, lat: f32) -> Result<bool, GeoError> {
        let p = match self.check_point(lon, lat) {
            Ok(p) => p,
            Err(e) => {
                warn!("Rejected insert at lon={}, lat={}", lon, lat);
                return Err(e);
            }
        };

        let root_box = self.root_box();
        let exists = match self.geos.get_mut(&id) {
            Some(stored) => {
                let old = std::mem::replace(stored, p);
                Self::remove_rec(&mut self.root, &id, old, root_box);
                true
            }
            None => {
                self.geos.insert(id.clone(), p);
                false
            }
        };

        Self::insert_rec(&mut self.root, id, p, root_box, 0, self.policy);
        Ok(!exists)
    }

    /// Remove `id`, returning the point it was stored at.
    pub fn remove(&mut self, id: &K) -> Result<LonLat, GeoError> {
        let p = self.geos.get(id).copied().ok_or(GeoError::NotFound)?;
        let root_box = self.root_box();
        Self::remove_rec(&mut self.root, id, p, root_box);
        self.geos.remove(id);
        Ok(p)
    }

    /// [`remove`](Self::remove) for callers that treat a missing id as a normal outcome.
    #[inline]
    pub fn erase(&mut self, id: &K) -> bool {
        self.remove(id).is_ok()
    }

    fn insert_rec(
        slot: &mut Option<Box<Node<K>>>,
        id: K,
        p: LonLat,
        mut bbox: GeoBox,
        depth: u32,
        policy: SplitPolicy,
    ) {
        let node = slot.get_or_insert_with(|| Box::new(Node::new_leaf()));

        let overflow = match node.as_mut() {
            Node::Leaf(leaf) => {
                let added = leaf.add(id, p);
                debug_assert!(added, "duplicate id reached a leaf");
                leaf.len() > policy.threshold && depth < policy.max_depth
            }
            Node::Inner(inner) => {
                let quadrant = bbox.locate_and_shrink(p);
                Self::insert_rec(inner.slot_mut(quadrant), id, p, bbox, depth + 1, policy);
                inner.update_count();
                false
            }
        };

        if overflow {
            debug!("Splitting leaf of {} entries at depth {}", node.count(), depth);
            node.split(&bbox);
        }
    }

    fn remove_rec(slot: &mut Option<Box<Node<K>>>, id: &K, p: LonLat, bbox: GeoBox) {
        let Some(node) = slot.as_mut() else {
            debug_assert!(false, "descended into an absent slot while removing");
            return;
        };

        match node.as_mut() {
            Node::Leaf(leaf) => leaf.remove(id),
            Node::Inner(inner) => {
                let mut child_box = bbox;
                let quadrant = child_box.locate_and_shrink(p);
                Self::remove_rec(inner.slot_mut(quadrant), id, p, child_box);
                inner.update_count();
            }
        }

        if node.count() == 0 {
            debug!("Pruning empty node at {:?}", bbox);
            *slot = None;
        }
    }

    /// Check every structural invariant, reporting the first one broken.
    pub fn verify(&self) -> Result<(), GeoError> {
        let root_count = self.root_count();
        if root_count != self.geos.len() {
            return Err(GeoError::InvariantViolation(format!(
                "root count {} != map size {}",
                root_count,
                self.geos.len()
            )));
        }
        match &self.root {
            Some(root) => self.verify_node(root, self.root_box(), 0),
            None => Ok(()),
        }
    }

    fn verify_node(&self, node: &Node<K>, bbox: GeoBox, depth: u32) -> Result<(), GeoError> {
        if node.count() == 0 {
            return Err(GeoError::InvariantViolation(format!(
                "empty node retained at {bbox:?}"
            )));
        }
        if depth > self.policy.max_depth {
            return Err(GeoError::InvariantViolation(format!(
                "node at depth {depth} exceeds max depth {}",
                self.policy.max_depth
            )));
        }

        match node {
            Node::Leaf(leaf) => {
                for (id, p) in leaf.iter() {
                    if !bbox.contains(*p) {
                        return Err(GeoError::InvariantViolation(format!(
                            "{p:?} stored outside {bbox:?}"
                        )));
                    }
                    if self.geos.get(id) != Some(p) {
                        return Err(GeoError::InvariantViolation(format!(
                            "leaf entry {p:?} disagrees with the id map"
                        )));
                    }
                }
                Ok(())
            }
            Node::Inner(inner) => {
                let sum: usize = inner.children().map(Node::count).sum();
                if sum != inner.count() {
                    return Err(GeoError::InvariantViolation(format!(
                        "inner count {} != children sum {sum}",
                        inner.count()
                    )));
                }
                for quadrant in super::bounds::Quadrant::ALL {
                    if let Some(child) = inner.child(quadrant) {
                        self.verify_node(child, bbox.bisect(quadrant), depth + 1)?;
                    }
                }
                Ok(())
            }
        }
    }
}
