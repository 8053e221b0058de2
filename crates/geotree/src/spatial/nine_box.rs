//! The 3x3 block of same-depth quadrants around a query's quadrant.
//!
//! Descending one level toward quadrant `d` of the center box maps each new
//! position to a child of one of the current nine. [`MOVES`] spells out all
//! 4 x 9 of those (source position, child quadrant) pairs.

use super::bounds::{GeoBox, Quadrant};
use super::node::Node;
use std::hash::Hash;

/// Position inside the 3x3 block, row-major from the north-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    NW = 0,
    N = 1,
    NE = 2,
    W = 3,
    C = 4,
    E = 5,
    SW = 6,
    S = 7,
    SE = 8,
}

impl Pos {
    #[cfg(test)]
    pub const ALL: [Pos; 9] = [
        Pos::NW,
        Pos::N,
        Pos::NE,
        Pos::W,
        Pos::C,
        Pos::E,
        Pos::SW,
        Pos::S,
        Pos::SE,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

use Pos as P;
use Quadrant as Q;

/// `MOVES[d][p]`: where position `p` comes from after moving toward quadrant `d`.
pub const MOVES: [[(Pos, Quadrant); 9]; 4] = [
    // toward NW
    [
        (P::NW, Q::SE),
        (P::N, Q::SW),
        (P::N, Q::SE),
        (P::W, Q::NE),
        (P::C, Q::NW),
        (P::C, Q::NE),
        (P::W, Q::SE),
        (P::C, Q::SW),
        (P::C, Q::SE),
    ],
    // toward NE
    [
        (P::N, Q::SW),
        (P::N, Q::SE),
        (P::NE, Q::SW),
        (P::C, Q::NW),
        (P::C, Q::NE),
        (P::E, Q::NW),
        (P::C, Q::SW),
        (P::C, Q::SE),
        (P::E, Q::SW),
    ],
    // toward SE
    [
        (P::C, Q::NW),
        (P::C, Q::NE),
        (P::E, Q::NW),
        (P::C, Q::SW),
        (P::C, Q::SE),
        (P::E, Q::SW),
        (P::S, Q::NW),
        (P::S, Q::NE),
        (P::SE, Q::NW),
    ],
    // toward SW
    [
        (P::W, Q::NE),
        (P::C, Q::NW),
        (P::C, Q::NE),
        (P::W, Q::SE),
        (P::C, Q::SW),
        (P::C, Q::SE),
        (P::SW, Q::NE),
        (P::S, Q::NW),
        (P::S, Q::NE),
    ],
];

/// Nine same-depth node references plus the center's box.
#[derive(Debug)]
pub struct NineBox<'a, K> {
    pub cells: [Option<&'a Node<K>>; 9],
    pub center_box: GeoBox,
    pub depth: u32,
}

impl<'a, K: Eq + Hash + Clone> NineBox<'a, K> {
    /// Depth 0 has a single box, so every position is the root.
    pub fn at_root(root: &'a Node<K>, root_box: GeoBox) -> Self {
        Self {
            cells: [Some(root); 9],
            center_box: root_box,
            depth: 0,
        }
    }

    #[inline]
    pub fn center(&self) -> Option<&'a Node<K>> {
        self.cells[Pos::C.index()]
    }

    /// The block one level down, centered on quadrant `toward` of the current center.
    ///
    /// A leaf stands in for its own sub-quadrants; an absent slot stays absent.
    pub fn moved(&self, toward: Quadrant) -> Self {
        let row = &MOVES[toward.index()];
        let mut cells = [None; 9];
        for (cell, &(src, quadrant)) in cells.iter_mut().zip(row.iter()) {
            *cell = self.cells[src.index()].and_then(|node| {
                if node.is_leaf() {
                    Some(node)
                } else {
                    node.child(quadrant)
                }
            });
        }
        Self {
            cells,
            center_box: self.center_box.bisect(toward),
            depth: self.depth + 1,
        }
    }

    /// Distinct present nodes; positions often share a reference near edges.
    pub fn distinct(&self) -> Vec<&'a Node<K>> {
        let mut out: Vec<&'a Node<K>> = Vec::with_capacity(9);
        for node in self.cells.iter().flatten() {
            if !out.iter().any(|seen| std::ptr::eq(*seen, *node)) {
                out.push(node);
            }
        }
        out
    }
}
