//! Quadtree nodes.

use super::bounds::{GeoBox, Quadrant};
use crate::geo::LonLat;
use std::collections::HashMap;
use std::hash::Hash;

/// A tree node: either a bucket of points or four optional quadrant children.
#[derive(Debug)]
pub enum Node<K> {
    Leaf(Leaf<K>),
    Inner(Inner<K>),
}

/// Points stored directly, keyed by id.
#[derive(Debug)]
pub struct Leaf<K> {
    entries: HashMap<K, LonLat>,
}

/// Four quadrant slots plus the total count below them.
#[derive(Debug)]
pub struct Inner<K> {
    children: [Option<Box<Node<K>>>; 4],
    count: usize,
}

impl<K: Eq + Hash + Clone> Node<K> {
    #[inline]
    pub fn new_leaf() -> Self {
        Node::Leaf(Leaf::new())
    }

    #[inline]
    pub fn count(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.len(),
            Node::Inner(inner) => inner.count,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Child in `quadrant`; leaves have none.
    #[inline]
    pub fn child(&self, quadrant: Quadrant) -> Option<&Node<K>> {
        match self {
            Node::Leaf(_) => None,
            Node::Inner(inner) => inner.child(quadrant),
        }
    }

    /// Turn this leaf into an inner node, spreading its entries over `bbox`'s quadrants.
    pub fn split(&mut self, bbox: &GeoBox) {
        if let Node::Leaf(leaf) = self {
            let entries = std::mem::take(&mut leaf.entries);
            *self = Node::Inner(Inner::split(bbox, entries));
        }
    }

    /// Push every entry in this subtree into `out`.
    pub fn collect_into<'a>(&'a self, out: &mut Vec<(&'a K, LonLat)>) {
        match self {
            Node::Leaf(leaf) => out.extend(leaf.iter().map(|(id, p)| (id, *p))),
            Node::Inner(inner) => {
                for child in inner.children() {
                    child.collect_into(out);
                }
            }
        }
    }

    /// Depth of the deepest node below (a lone leaf is depth 0).
    pub fn depth(&self) -> u32 {
        match self {
            Node::Leaf(_) => 0,
            Node::Inner(inner) => 1 + inner.children().map(Node::depth).max().unwrap_or(0),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Inner(inner) => inner.children().map(Node::leaf_count).sum(),
        }
    }
}

impl<K: Eq + Hash + Clone> Leaf<K> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns false if `id` was already here.
    pub fn add(&mut self, id: K, p: LonLat) -> bool {
        match self.entries.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(p);
                true
            }
        }
    }

    /// Remove an id the caller already knows is stored here.
    pub fn remove(&mut self, id: &K) {
        let removed = self.entries.remove(id);
        debug_assert!(removed.is_some(), "removing an id the leaf does not hold");
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &LonLat)> {
        self.entries.iter()
    }
}

impl<K: Eq + Hash + Clone> Default for Leaf<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> Inner<K> {
    /// Distribute `entries` into fresh leaves by quadrant of `bbox`.
    pub fn split(bbox: &GeoBox, entries: HashMap<K, LonLat>) -> Self {
        let mut inner = Inner {
            children: [None, None, None, None],
            count: 0,
        };
        for (id, p) in entries {
            let slot = inner.slot_mut(bbox.locate(p));
            let child = slot.get_or_insert_with(|| Box::new(Node::new_leaf()));
            if let Node::Leaf(leaf) = child.as_mut() {
                leaf.add(id, p);
            }
        }
        inner.update_count();
        inner
    }

    #[inline]
    pub fn child(&self, quadrant: Quadrant) -> Option<&Node<K>> {
        self.children[quadrant.index()].as_deref()
    }

    #[inline]
    pub fn slot_mut(&mut self, quadrant: Quadrant) -> &mut Option<Box<Node<K>>> {
        &mut self.children[quadrant.index()]
    }

    /// Present children in NW, NE, SE, SW order.
    pub fn children(&self) -> impl Iterator<Item = &Node<K>> {
        self.children.iter().filter_map(|c| c.as_deref())
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Recompute the aggregate from the present children.
    #[inline]
    pub fn update_count(&mut self) {
        self.count = self.children().map(Node::count).sum();
    }
}
