use geo::{LineString, Simplify};

/// Douglas-Peucker simplification of one segment line.
///
/// A closed segment (a boundary that was never cut, so start = end) is
/// split at its midpoint vertex and the halves are simplified
/// separately; simplifying the loop whole can collapse it to a point.
/// The first and last coordinates are always preserved.
pub fn simplify_segment(line: &LineString<f64>, tolerance: f64) -> LineString<f64> {
    if tolerance <= 0.0 || line.0.len() < 3 {
        return line.clone();
    }

    if line.is_closed() {
        let midpoint = line.0.len() / 2;
        let first = LineString::new(line.0[..=midpoint].to_vec());
        let second = LineString::new(line.0[midpoint..].to_vec());
        let simplified1 = first.simplify(&tolerance);
        let simplified2 = second.simplify(&tolerance);

        let mut coords = simplified1.0;
        coords.pop();
        coords.extend(simplified2.0);
        LineString::new(coords)
    } else {
        line.simplify(&tolerance)
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    use super::simplify_segment;

    fn ls(pts: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(pts.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn drops_near_collinear_interior_points() {
        let line = ls(&[(0.0, 0.0), (1.0, 0.001), (2.0, 0.0), (3.0, 0.001), (4.0, 0.0)]);
        let simplified = simplify_segment(&line, 0.5);
        assert_eq!(simplified.0.len(), 2);
        assert_eq!(simplified.0[0], Coord { x: 0.0, y: 0.0 });
        assert_eq!(simplified.0[1], Coord { x: 4.0, y: 0.0 });
    }

    #[test]
    fn zero_tolerance_is_identity() {
        let line = ls(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(simplify_segment(&line, 0.0), line);
    }

    #[test]
    fn closed_ring_survives_simplification() {
        let ring = ls(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (2.0, 2.0),
            (1.0, 2.0),
            (0.0, 2.0),
            (0.0, 1.0),
            (0.0, 0.0),
        ]);
        let simplified = simplify_segment(&ring, 0.5);
        assert!(simplified.0.len() >= 4);
        assert_eq!(simplified.0.first(), simplified.0.last());
        assert_eq!(simplified.0[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn endpoints_are_preserved() {
        let line = ls(&[(0.0, 0.0), (0.4, 0.1), (1.0, 0.0)]);
        let simplified = simplify_segment(&line, 10.0);
        assert_eq!(simplified.0.first(), line.0.first());
        assert_eq!(simplified.0.last(), line.0.last());
    }
}
