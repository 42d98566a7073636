//! Reassembly of two-vertex pieces into maximal connected chains.
//!
//! The intersection of two boundary rings is computed as a flat set of
//! shared edges; this module stitches those pieces back into the longest
//! possible open polylines, detecting the case where the walk closes on
//! itself into a ring.

use ahash::{AHashMap, AHashSet};
use geo::Coord;

use crate::geometry::QCoord;

/// A maximal connected run of pieces. For a closed chain the coordinate
/// list repeats its first coordinate at the end.
#[derive(Clone, Debug)]
pub struct Chain {
    pub coords: Vec<Coord<f64>>,
    pub closed: bool,
}

impl Chain {
    #[inline]
    pub fn start(&self) -> Coord<f64> {
        self.coords[0]
    }

    #[inline]
    pub fn end(&self) -> Coord<f64> {
        *self.coords.last().expect("chain has coordinates")
    }
}

/// Stitch undirected two-vertex pieces into maximal chains.
///
/// Open chains are grown from degree-1 vertices; whatever edges remain
/// afterwards form closed loops. At a junction vertex the walk takes an
/// arbitrary unused continuation; junctions do not occur for pieces that
/// come from the shared border of two simple rings.
pub fn assemble_chains(pieces: &[(Coord<f64>, Coord<f64>)]) -> Vec<Chain> {
    if pieces.is_empty() {
        return Vec::new();
    }

    // Adjacency over quantized vertices; remember one representative
    // world coordinate per vertex.
    let mut adjacency: AHashMap<QCoord, Vec<(QCoord, usize)>> = AHashMap::new();
    let mut world: AHashMap<QCoord, Coord<f64>> = AHashMap::new();
    for (i, &(p, q)) in pieces.iter().enumerate() {
        let (qp, qq) = (QCoord::new(p), QCoord::new(q));
        if qp == qq {
            continue; // degenerate piece
        }
        adjacency.entry(qp).or_default().push((qq, i));
        adjacency.entry(qq).or_default().push((qp, i));
        world.entry(qp).or_insert(p);
        world.entry(qq).or_insert(q);
    }

    let mut used: AHashSet<usize> = AHashSet::new();
    let mut chains = Vec::new();

    let walk = |start: QCoord, used: &mut AHashSet<usize>| -> Option<Vec<QCoord>> {
        let mut path = vec![start];
        let mut curr = start;
        loop {
            let next = adjacency[&curr]
                .iter()
                .find(|&&(_, edge)| !used.contains(&edge))
                .copied();
            match next {
                Some((vertex, edge)) => {
                    used.insert(edge);
                    path.push(vertex);
                    curr = vertex;
                }
                None => break,
            }
        }
        if path.len() > 1 {
            Some(path)
        } else {
            None
        }
    };

    // Deterministic iteration: sorted vertex order.
    let mut vertices: Vec<QCoord> = adjacency.keys().copied().collect();
    vertices.sort();

    let unused_degree = |vertex: &QCoord, used: &AHashSet<usize>| {
        adjacency[vertex]
            .iter()
            .filter(|&&(_, edge)| !used.contains(&edge))
            .count()
    };

    // Open chains start at odd-degree vertices.
    for &vertex in &vertices {
        while unused_degree(&vertex, &used) % 2 == 1 {
            match walk(vertex, &mut used) {
                Some(path) => chains.push((path, false)),
                None => break,
            }
        }
    }

    // Remaining edges form closed loops.
    for &vertex in &vertices {
        loop {
            match walk(vertex, &mut used) {
                Some(path) => {
                    let closed = path.first() == path.last();
                    chains.push((path, closed));
                }
                None => break,
            }
        }
    }

    chains
        .into_iter()
        .map(|(path, closed)| Chain {
            coords: path.iter().map(|q| world[q]).collect(),
            closed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::Coord;

    use super::assemble_chains;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    #[test]
    fn stitches_an_open_run() {
        let pieces = vec![
            (c(1.0, 0.0), c(2.0, 0.0)),
            (c(0.0, 0.0), c(1.0, 0.0)),
            (c(2.0, 0.0), c(2.0, 1.0)),
        ];
        let chains = assemble_chains(&pieces);
        assert_eq!(chains.len(), 1);
        assert!(!chains[0].closed);
        assert_eq!(chains[0].coords.len(), 4);
        let (s, e) = (chains[0].start(), chains[0].end());
        assert!(
            (s == c(0.0, 0.0) && e == c(2.0, 1.0)) || (s == c(2.0, 1.0) && e == c(0.0, 0.0))
        );
    }

    #[test]
    fn detects_a_closed_loop() {
        let pieces = vec![
            (c(0.0, 0.0), c(1.0, 0.0)),
            (c(1.0, 0.0), c(1.0, 1.0)),
            (c(1.0, 1.0), c(0.0, 1.0)),
            (c(0.0, 1.0), c(0.0, 0.0)),
        ];
        let chains = assemble_chains(&pieces);
        assert_eq!(chains.len(), 1);
        assert!(chains[0].closed);
        assert_eq!(chains[0].coords.len(), 5);
    }

    #[test]
    fn separates_disconnected_runs() {
        let pieces = vec![
            (c(0.0, 0.0), c(1.0, 0.0)),
            (c(5.0, 5.0), c(6.0, 5.0)),
        ];
        let chains = assemble_chains(&pieces);
        assert_eq!(chains.len(), 2);
    }
}
