//! Tracing of label grids into polygons.
//!
//! Algorithm:
//! 1. Label every 4-connected component of the tile
//! 2. For each component, collect the directed lattice edges separating
//!    its cells from differently-labeled (or out-of-grid) cells,
//!    oriented so the component stays on the walker's right
//! 3. Walk the edges into closed rings; where several continuations
//!    leave one corner, take the sharpest right turn, which keeps each
//!    ring simple
//! 4. The largest-area ring of a component is its exterior, the rest
//!    are holes
//! 5. Map pixel corners to world space through the affine transform
//!
//! Rings keep a vertex at every pixel corner they pass. Adjacent
//! polygons therefore contain the identical unit-edge chain along their
//! shared border, which is what the segmenter's intersection matching
//! relies on.

use ahash::AHashMap;
use geo::{Coord, LineString, Polygon};
use ndarray::Array2;

use crate::blobifier::label_components;
use crate::raster::{AffineTransform, NODATA};
use crate::tiler::{Feature, FeatureSet, TileParams};

/// A lattice corner (row, col); corners run 0..=rows and 0..=cols.
type Corner = (u32, u32);

/// Trace every component of `data` into a labeled polygon, skipping the
/// sentinel. `tile` supplies the global pixel offset of the array.
pub fn polygonize_tile(
    data: &Array2<i32>,
    tile: &TileParams,
    transform: &AffineTransform,
) -> FeatureSet {
    let (components, sizes) = label_components(data);
    let num_components = sizes.len();

    // One representative cell per component, in scan order.
    let mut label_of: Vec<i32> = vec![NODATA; num_components];
    for (cell, &component) in components.indexed_iter() {
        if label_of[component as usize] == NODATA {
            label_of[component as usize] = data[cell];
        }
    }

    let mut edges_of: Vec<Vec<(Corner, Corner)>> = vec![Vec::new(); num_components];
    collect_boundary_edges(&components, &mut edges_of);

    let mut features = Vec::new();
    for component in 0..num_components {
        let label = label_of[component];
        if label == NODATA {
            continue;
        }
        let rings = trace_rings(&edges_of[component]);
        if rings.is_empty() {
            continue;
        }
        features.push(Feature {
            polygon: rings_to_polygon(rings, tile, transform),
            label,
        });
    }
    FeatureSet { features }
}

/// Emit the directed boundary edges of every component. For a cell in
/// the square [c, c+1] x [r, r+1] the four sides are directed so the
/// cell lies to the right of the walk:
/// top left-to-right, right side downward, bottom right-to-left, left
/// side upward.
fn collect_boundary_edges(components: &Array2<i32>, edges_of: &mut [Vec<(Corner, Corner)>]) {
    let (rows, cols) = components.dim();
    let differs = |component: i32, nr: i64, nc: i64| -> bool {
        if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
            return true;
        }
        components[(nr as usize, nc as usize)] != component
    };

    for r in 0..rows {
        for c in 0..cols {
            let component = components[(r, c)];
            let edges = &mut edges_of[component as usize];
            let (r32, c32) = (r as u32, c as u32);
            if differs(component, r as i64 - 1, c as i64) {
                edges.push(((r32, c32), (r32, c32 + 1)));
            }
            if differs(component, r as i64, c as i64 + 1) {
                edges.push(((r32, c32 + 1), (r32 + 1, c32 + 1)));
            }
            if differs(component, r as i64 + 1, c as i64) {
                edges.push(((r32 + 1, c32 + 1), (r32 + 1, c32)));
            }
            if differs(component, r as i64, c as i64 - 1) {
                edges.push(((r32 + 1, c32), (r32, c32)));
            }
        }
    }
}

/// Unit direction between adjacent corners.
#[inline]
fn direction(from: Corner, to: Corner) -> (i32, i32) {
    (
        to.0 as i32 - from.0 as i32,
        to.1 as i32 - from.1 as i32,
    )
}

/// Clockwise (screen coordinates, rows increasing downward) rotation.
#[inline]
fn clockwise(d: (i32, i32)) -> (i32, i32) {
    (d.1, -d.0)
}

#[inline]
fn counterclockwise(d: (i32, i32)) -> (i32, i32) {
    (-d.1, d.0)
}

/// Walk directed boundary edges into closed rings. Every corner has as
/// many incoming as outgoing edges, so a walk can only stop by arriving
/// back at its starting corner.
fn trace_rings(edges: &[(Corner, Corner)]) -> Vec<Vec<Corner>> {
    let mut outgoing: AHashMap<Corner, Vec<(Corner, usize)>> = AHashMap::new();
    for (i, &(from, to)) in edges.iter().enumerate() {
        outgoing.entry(from).or_default().push((to, i));
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start_idx in 0..edges.len() {
        if used[start_idx] {
            continue;
        }
        let (start, first) = edges[start_idx];
        used[start_idx] = true;

        let mut ring = vec![start, first];
        let mut dir = direction(start, first);
        let mut curr = first;

        while curr != start {
            let candidates = &outgoing[&curr];
            // Sharpest right turn first; a reversal is never taken
            // unless it is the only continuation.
            let preference = [clockwise(dir), dir, counterclockwise(dir), (-dir.0, -dir.1)];
            let next = preference.iter().find_map(|&d| {
                candidates
                    .iter()
                    .find(|&&(to, idx)| !used[idx] && direction(curr, to) == d)
                    .copied()
            });
            match next {
                Some((to, idx)) => {
                    used[idx] = true;
                    dir = direction(curr, to);
                    ring.push(to);
                    curr = to;
                }
                None => break,
            }
        }
        // Valid ring: at least 4 points (3 + closing) and closed.
        if ring.len() >= 4 && ring.first() == ring.last() {
            rings.push(ring);
        }
    }
    rings
}

/// Signed area of a closed corner ring (pixel space), for picking the
/// exterior ring of a component.
fn ring_area(ring: &[Corner]) -> f64 {
    let mut doubled = 0i64;
    for pair in ring.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        doubled += a.1 as i64 * b.0 as i64 - b.1 as i64 * a.0 as i64;
    }
    doubled as f64 / 2.0
}

/// Assemble one component's rings into a polygon in world space.
fn rings_to_polygon(
    rings: Vec<Vec<Corner>>,
    tile: &TileParams,
    transform: &AffineTransform,
) -> Polygon<f64> {
    let exterior_idx = rings
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            ring_area(a)
                .abs()
                .total_cmp(&ring_area(b).abs())
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let to_world = |ring: &[Corner]| -> LineString<f64> {
        LineString::new(
            ring.iter()
                .map(|&(r, c)| {
                    let col = (tile.start_y + c as usize) as f64;
                    let row = (tile.start_x + r as usize) as f64;
                    transform.apply(col, row)
                })
                .collect::<Vec<Coord<f64>>>(),
        )
    };

    let exterior = to_world(&rings[exterior_idx]);
    let interiors: Vec<LineString<f64>> = rings
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != exterior_idx)
        .map(|(_, ring)| to_world(ring))
        .collect();
    Polygon::new(exterior, interiors)
}
