//! Computes the shared portions between every pair of boundaries.
//!
//! Candidate pairs come from an R-tree over boundary bounding boxes.
//! Because every ring carries a vertex at each pixel corner it passes,
//! the geometric intersection of two rings is exactly their shared set
//! of unit edges; those two-vertex pieces are reassembled into maximal
//! connected segments, and a reassembly that closes on itself is the
//! ring-coincidence case.

use ahash::AHashMap;
use geo::{Coord, LineString};
use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{assemble_chains, Chain, QEdge};

use super::boundary::Boundary;

/// A boundary's bounding box in the R-tree, associated by index.
struct BoundingBox {
    idx: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl BoundingBox {
    fn new(idx: usize, boundary: &Boundary) -> Self {
        let mut min = [f64::INFINITY, f64::INFINITY];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        for coord in &boundary.line.0 {
            min[0] = min[0].min(coord.x);
            min[1] = min[1].min(coord.y);
            max[0] = max[0].max(coord.x);
            max[1] = max[1].max(coord.y);
        }
        Self { idx, min, max }
    }
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

/// Quantized unit edges of one ring, remembering the original
/// coordinates in ring direction.
fn edge_map(boundary: &Boundary) -> AHashMap<QEdge, (Coord<f64>, Coord<f64>)> {
    boundary
        .line
        .0
        .windows(2)
        .map(|pair| (QEdge::new(pair[0], pair[1]), (pair[0], pair[1])))
        .collect()
}

/// Orient a chain to follow the boundary's ring direction, using the
/// cyclic arc-length delta of its first two coordinates.
fn orient_along(boundary: &Boundary, chain: &Chain) -> LineString<f64> {
    let mut coords = chain.coords.clone();
    if coords.len() >= 2 {
        let pos0 = boundary.point_position(coords[0]);
        let pos1 = boundary.point_position(coords[1]);
        let delta = (pos1 - pos0).rem_euclid(boundary.length());
        if delta > boundary.length() / 2.0 {
            coords.reverse();
        }
    }
    LineString::new(coords)
}

pub struct IntersectionsComputer<'a> {
    boundaries: &'a mut [Boundary],
}

enum PairIntersection {
    Ring(LineString<f64>),
    Open(Vec<LineString<f64>>),
}

impl<'a> IntersectionsComputer<'a> {
    pub fn new(boundaries: &'a mut [Boundary]) -> Self {
        Self { boundaries }
    }

    /// Record on each boundary which other boundaries it shares
    /// geometry with, and where.
    pub fn compute_intersections(&mut self) {
        let edge_maps: Vec<AHashMap<QEdge, (Coord<f64>, Coord<f64>)>> =
            self.boundaries.iter().map(edge_map).collect();
        let rtree = RTree::bulk_load(
            self.boundaries
                .iter()
                .map(|b| BoundingBox::new(b.idx, b))
                .collect(),
        );

        let mut results: Vec<(usize, usize, PairIntersection)> = Vec::new();
        for b in 0..self.boundaries.len() {
            let envelope = BoundingBox::new(b, &self.boundaries[b]).envelope();
            for candidate in rtree.locate_in_envelope_intersecting(&envelope) {
                let n = candidate.idx;
                if n <= b {
                    continue; // handled already
                }

                let (small, large) = if edge_maps[b].len() <= edge_maps[n].len() {
                    (&edge_maps[b], &edge_maps[n])
                } else {
                    (&edge_maps[n], &edge_maps[b])
                };
                let pieces: Vec<(Coord<f64>, Coord<f64>)> = small
                    .iter()
                    .filter(|(edge, _)| large.contains_key(edge))
                    .map(|(_, &coords)| coords)
                    .collect();
                if pieces.is_empty() {
                    continue;
                }

                let chains = assemble_chains(&pieces);
                if chains.is_empty() {
                    continue;
                }

                if chains.iter().any(|chain| chain.closed) {
                    assert!(
                        chains.len() == 1,
                        "a ring intersection must be the only intersection"
                    );
                    let ring = LineString::new(chains[0].coords.clone());
                    results.push((b, n, PairIntersection::Ring(ring)));
                } else {
                    let oriented: Vec<LineString<f64>> = chains
                        .iter()
                        .map(|chain| orient_along(&self.boundaries[b], chain))
                        .collect();
                    results.push((b, n, PairIntersection::Open(oriented)));
                }
            }
        }

        for (b, n, intersection) in results {
            match intersection {
                PairIntersection::Ring(ring) => {
                    self.boundaries[b].ring_intersections.insert(n, ring.clone());
                    self.boundaries[n].ring_intersections.insert(b, ring);
                }
                PairIntersection::Open(segments) => {
                    self.boundaries[b].intersections.insert(n, segments.clone());
                    self.boundaries[n].intersections.insert(b, segments);
                }
            }
        }
    }

    /// Record the portions of each boundary lying on the outer border
    /// of the union of all polygons. The tile's polygons partition its
    /// rectangle, so a unit edge lies on that border exactly when it
    /// appears in a single ring across all boundaries.
    pub fn compute_border_intersections(&mut self) {
        let edge_maps: Vec<AHashMap<QEdge, (Coord<f64>, Coord<f64>)>> =
            self.boundaries.iter().map(edge_map).collect();

        let mut multiplicity: AHashMap<QEdge, u32> = AHashMap::new();
        for map in &edge_maps {
            for edge in map.keys() {
                *multiplicity.entry(*edge).or_insert(0) += 1;
            }
        }

        for b in 0..self.boundaries.len() {
            let pieces: Vec<(Coord<f64>, Coord<f64>)> = edge_maps[b]
                .iter()
                .filter(|(edge, _)| multiplicity[edge] == 1)
                .map(|(_, &coords)| coords)
                .collect();
            if pieces.is_empty() {
                continue;
            }
            let chains = assemble_chains(&pieces);
            self.boundaries[b].border_intersections = chains
                .iter()
                .map(|chain| orient_along(&self.boundaries[b], chain))
                .collect();
        }
    }
}
