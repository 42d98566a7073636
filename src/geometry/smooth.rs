use geo::{Coord, LineString};

/// Chaikin's corner cutting with a fixed number of refinements.
///
/// Each refinement replaces every edge with points at 25% and 75% along
/// it. The first and last coordinates are kept exactly as-is, including
/// for closed lines, whose seam vertex must stay pinned so segments that
/// share endpoints still meet after smoothing.
pub fn smooth_segment(line: &LineString<f64>, refinements: usize) -> LineString<f64> {
    if refinements == 0 || line.0.len() < 3 {
        return line.clone();
    }

    let mut coords = line.0.clone();
    for _ in 0..refinements {
        coords = cut_corners(&coords);
    }
    LineString::new(coords)
}

fn cut_corners(coords: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out = Vec::with_capacity(coords.len() * 2);
    out.push(coords[0]);
    for pair in coords.windows(2) {
        let (p, q) = (pair[0], pair[1]);
        out.push(Coord {
            x: 0.75 * p.x + 0.25 * q.x,
            y: 0.75 * p.y + 0.25 * q.y,
        });
        out.push(Coord {
            x: 0.25 * p.x + 0.75 * q.x,
            y: 0.25 * p.y + 0.75 * q.y,
        });
    }
    out.push(*coords.last().expect("line has coordinates"));
    out
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    use super::smooth_segment;

    fn ls(pts: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(pts.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn preserves_endpoints() {
        let line = ls(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        let smoothed = smooth_segment(&line, 3);
        assert_eq!(smoothed.0.first(), line.0.first());
        assert_eq!(smoothed.0.last(), line.0.last());
    }

    #[test]
    fn cuts_the_corner() {
        let line = ls(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
        let smoothed = smooth_segment(&line, 1);
        // The apex itself must be gone.
        assert!(!smoothed.0.contains(&Coord { x: 1.0, y: 1.0 }));
        assert!(smoothed.0.contains(&Coord { x: 0.75, y: 0.75 }));
        assert!(smoothed.0.contains(&Coord { x: 1.25, y: 0.75 }));
    }

    #[test]
    fn two_point_lines_are_unchanged() {
        let line = ls(&[(0.0, 0.0), (1.0, 0.0)]);
        assert_eq!(smooth_segment(&line, 5), line);
    }

    #[test]
    fn closed_line_stays_closed() {
        let ring = ls(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let smoothed = smooth_segment(&ring, 2);
        assert_eq!(smoothed.0.first(), smoothed.0.last());
    }
}
