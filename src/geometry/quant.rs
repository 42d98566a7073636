use geo::Coord;

use crate::geometry::EPSILON;

/// A coordinate quantized for exact hashing and equality, at the shared
/// comparison tolerance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QCoord {
    x: i64,
    y: i64,
}

impl QCoord {
    pub fn new(c: Coord<f64>) -> Self {
        Self {
            x: (c.x / EPSILON).round() as i64,
            y: (c.y / EPSILON).round() as i64,
        }
    }

    pub fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.x as f64 * EPSILON,
            y: self.y as f64 * EPSILON,
        }
    }
}

/// An undirected edge between two quantized coordinates, stored in
/// canonical (smaller endpoint first) order so that the same edge hashes
/// identically regardless of traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QEdge {
    a: QCoord,
    b: QCoord,
}

impl QEdge {
    pub fn new(p: Coord<f64>, q: Coord<f64>) -> Self {
        Self::from_quantized(QCoord::new(p), QCoord::new(q))
    }

    pub fn from_quantized(a: QCoord, b: QCoord) -> Self {
        if a <= b {
            Self { a, b }
        } else {
            Self { a: b, b: a }
        }
    }
}
