//! Small ring and polyline helpers shared by the polygonizer and the
//! segmenter.

use geo::{Coord, LineString};

use crate::geometry::EPSILON;

/// Whether two coordinates are equal within the shared tolerance.
#[inline]
pub fn coords_eq(a: Coord<f64>, b: Coord<f64>) -> bool {
    (a.x - b.x).abs() < EPSILON && (a.y - b.y).abs() < EPSILON
}

/// Ensure first and last coordinates are the same.
pub fn close_ring(coords: &mut Vec<Coord<f64>>) {
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(first);
        }
    }
}

/// Whether two polylines have the same coordinate sequence within
/// tolerance.
pub fn lines_equal(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    a.0.len() == b.0.len() && a.0.iter().zip(b.0.iter()).all(|(&p, &q)| coords_eq(p, q))
}

/// Whether `a` equals `b` traversed in the opposite direction.
pub fn lines_equal_reversed(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    a.0.len() == b.0.len() && a.0.iter().zip(b.0.iter().rev()).all(|(&p, &q)| coords_eq(p, q))
}

/// Remove vertices that lie on a straight line between their cyclic
/// neighbors. Operates on a closed ring; the result is re-closed and may
/// start at a different vertex than the input.
pub fn remove_collinear(ring: &LineString<f64>) -> LineString<f64> {
    let coords = &ring.0;
    if coords.len() < 4 {
        return ring.clone();
    }
    // Drop the duplicate closing coordinate while working cyclically.
    let open = &coords[..coords.len() - 1];
    let n = open.len();

    let mut kept: Vec<Coord<f64>> = Vec::with_capacity(n);
    for i in 0..n {
        let prev = open[(i + n - 1) % n];
        let curr = open[i];
        let next = open[(i + 1) % n];
        let cross = (curr.x - prev.x) * (next.y - prev.y) - (curr.y - prev.y) * (next.x - prev.x);
        if cross.abs() > EPSILON {
            kept.push(curr);
        }
    }
    if kept.len() < 3 {
        return ring.clone();
    }
    close_ring(&mut kept);
    LineString::new(kept)
}

/// Whether two closed rings trace the same cycle of corners, in either
/// direction and from any starting vertex. Collinear vertices are
/// removed on both sides first.
pub fn rings_equal_cyclic(a: &LineString<f64>, b: &LineString<f64>) -> bool {
    let a = remove_collinear(a);
    let b = remove_collinear(b);

    // Compare the open cycles.
    let av = &a.0[..a.0.len().saturating_sub(1)];
    let bv = &b.0[..b.0.len().saturating_sub(1)];
    if av.len() != bv.len() || av.is_empty() {
        return av.len() == bv.len();
    }
    let n = av.len();

    for offset in 0..n {
        if (0..n).all(|i| coords_eq(av[i], bv[(i + offset) % n])) {
            return true;
        }
        if (0..n).all(|i| coords_eq(av[i], bv[(n + offset - i) % n])) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    fn ls(pts: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(pts.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn removes_collinear_vertices() {
        let ring = ls(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ]);
        let cleaned = super::remove_collinear(&ring);
        assert_eq!(cleaned.0.len(), 5); // 4 corners + closing vertex
    }

    #[test]
    fn cyclic_equality_handles_rotation_and_reversal() {
        let a = ls(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0)]);
        let rotated = ls(&[(2.0, 0.0), (2.0, 2.0), (0.0, 2.0), (0.0, 0.0), (2.0, 0.0)]);
        let reversed = ls(&[(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0), (0.0, 0.0)]);
        let other = ls(&[(0.0, 0.0), (3.0, 0.0), (3.0, 2.0), (0.0, 2.0), (0.0, 0.0)]);
        assert!(super::rings_equal_cyclic(&a, &rotated));
        assert!(super::rings_equal_cyclic(&a, &reversed));
        assert!(!super::rings_equal_cyclic(&a, &other));
    }
}
