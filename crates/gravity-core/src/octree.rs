// ─────────────────────────────────────────────────────────────────────
// SCPN Gravity Core — Octree Spatial Index
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Octree over the computational domain for stratum-density lookup.
//!
//! Strata are inserted into the deepest node whose box they intersect
//! without exceeding the per-node capacity. Lookup walks root-to-leaf and
//! checks strata stored at every node along the path, so a stratum held by
//! an internal node is never skipped.

use gravity_types::state::{Domain, Stratum};

const MAX_DEPTH: u32 = 8;
const NODE_CAPACITY: usize = 10;

/// Axis-aligned box, closed on all faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl BoundingBox {
    pub fn from_domain(domain: &Domain) -> Self {
        Self {
            min_x: domain.start_x.min(domain.end_x),
            max_x: domain.start_x.max(domain.end_x),
            min_y: domain.start_y.min(domain.end_y),
            max_y: domain.start_y.max(domain.end_y),
            min_z: domain.start_z.min(domain.end_z),
            max_z: domain.start_z.max(domain.end_z),
        }
    }

    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.min_x
            && x <= self.max_x
            && y >= self.min_y
            && y <= self.max_y
            && z >= self.min_z
            && z <= self.max_z
    }

    pub fn intersects(&self, stratum: &Stratum) -> bool {
        stratum.start_x <= self.max_x
            && stratum.end_x >= self.min_x
            && stratum.start_y <= self.max_y
            && stratum.end_y >= self.min_y
            && stratum.start_z <= self.max_z
            && stratum.end_z >= self.min_z
    }

    /// Eight equal octants, ordered by (x-half, y-half, z-half) bits.
    pub fn subdivide(&self) -> [BoundingBox; 8] {
        let mid_x = 0.5 * (self.min_x + self.max_x);
        let mid_y = 0.5 * (self.min_y + self.max_y);
        let mid_z = 0.5 * (self.min_z + self.max_z);

        std::array::from_fn(|octant| {
            let (min_x, max_x) = if octant & 1 == 0 {
                (self.min_x, mid_x)
            } else {
                (mid_x, self.max_x)
            };
            let (min_y, max_y) = if octant & 2 == 0 {
                (self.min_y, mid_y)
            } else {
                (mid_y, self.max_y)
            };
            let (min_z, max_z) = if octant & 4 == 0 {
                (self.min_z, mid_z)
            } else {
                (mid_z, self.max_z)
            };
            BoundingBox { min_x, max_x, min_y, max_y, min_z, max_z }
        })
    }
}

struct Node {
    bounds: BoundingBox,
    depth: u32,
    strata: Vec<Stratum>,
    children: Option<Box<[Node; 8]>>,
}

impl Node {
    fn new(bounds: BoundingBox, depth: u32) -> Self {
        Self { bounds, depth, strata: Vec::new(), children: None }
    }

    fn insert(&mut self, stratum: Stratum) {
        if !self.bounds.intersects(&stratum) {
            return;
        }
        if self.children.is_none() {
            if self.strata.len() < NODE_CAPACITY || self.depth >= MAX_DEPTH {
                self.strata.push(stratum);
                return;
            }
            self.split();
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                child.insert(stratum);
            }
        }
    }

    fn split(&mut self) {
        let boxes = self.bounds.subdivide();
        let depth = self.depth + 1;
        let mut children = Box::new(boxes.map(|b| Node::new(b, depth)));
        for stratum in self.strata.drain(..) {
            for child in children.iter_mut() {
                child.insert(stratum);
            }
        }
        self.children = Some(children);
    }

    fn find_density(&self, x: f64, y: f64, z: f64) -> Option<f64> {
        if !self.bounds.contains(x, y, z) {
            return None;
        }
        // Later insertions override earlier ones at the same point.
        let own = self
            .strata
            .iter()
            .rev()
            .find(|s| s.contains(x, y, z))
            .map(|s| s.density);
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if let Some(density) = child.find_density(x, y, z) {
                    return Some(density);
                }
            }
        }
        own
    }
}

/// Spatial index over the domain's geological strata.
pub struct Octree {
    root: Node,
}

impl Octree {
    pub fn new(domain: &Domain) -> Self {
        Self { root: Node::new(BoundingBox::from_domain(domain), 0) }
    }

    pub fn insert(&mut self, stratum: Stratum) {
        self.root.insert(stratum);
    }

    /// Density of the innermost stratum containing the point, if any.
    pub fn find_density(&self, x: f64, y: f64, z: f64) -> Option<f64> {
        self.root.find_density(x, y, z)
    }
}
