//! Computes cutpoints of boundaries by which to then split them into
//! segments.
//!
//! Every boundary's own starting vertex is a cutpoint; the endpoints of
//! every open shared segment are cutpoints of both boundaries involved;
//! a neighbor's starting vertex that lies on this boundary is a
//! cutpoint too (and symmetrically). When the outer border is pinned,
//! every vertex along a border portion becomes a cutpoint, which fixes
//! the border through later per-segment operations.

use geo::Coord;

use super::boundary::Boundary;

pub struct CutpointsComputer<'a> {
    boundaries: &'a mut [Boundary],
}

impl<'a> CutpointsComputer<'a> {
    pub fn new(boundaries: &'a mut [Boundary]) -> Self {
        Self { boundaries }
    }

    pub fn compute_cutpoints(&mut self) {
        self.neighbor_start_cutpoints();
        self.intersection_endpoint_cutpoints();
    }

    /// Rule: a neighbor's starting vertex lying on this boundary cuts
    /// this boundary. Intersection maps are symmetric, so visiting
    /// every (boundary, neighbor) pair covers both directions.
    fn neighbor_start_cutpoints(&mut self) {
        let mut additions: Vec<(usize, Coord<f64>)> = Vec::new();
        for b in 0..self.boundaries.len() {
            let boundary = &self.boundaries[b];
            let neighbors = boundary
                .intersections
                .keys()
                .chain(boundary.ring_intersections.keys());
            for &n in neighbors {
                let other_start = self.boundaries[n].line.0[0];
                if boundary.on_boundary(other_start) {
                    additions.push((b, other_start));
                }
            }
        }
        for (b, point) in additions {
            self.boundaries[b].add_cutpoint(point);
        }
    }

    /// Rule: each boundary is cut at its own starting vertex and at the
    /// start and end of every open shared segment.
    fn intersection_endpoint_cutpoints(&mut self) {
        for boundary in self.boundaries.iter_mut() {
            let mut cutpoints = vec![boundary.line.0[0]];
            for segments in boundary.intersections.values() {
                for segment in segments {
                    if segment.is_closed() {
                        continue;
                    }
                    cutpoints.push(segment.0[0]);
                    if let Some(&end) = segment.0.last() {
                        cutpoints.push(end);
                    }
                }
            }
            for point in cutpoints {
                boundary.add_cutpoint(point);
            }
        }
    }

    /// Rule (border pinning): every vertex along a border portion is a
    /// cutpoint. A boundary lying entirely on the border keeps every
    /// ring vertex.
    pub fn compute_border_cutpoints(&mut self) {
        for boundary in self.boundaries.iter_mut() {
            if boundary.border_intersections.is_empty() {
                continue;
            }
            let keep_all = boundary.border_intersections.len() == 1
                && boundary.border_intersections[0].is_closed();
            let vertices: Vec<Coord<f64>> = if keep_all {
                boundary.open_coords().to_vec()
            } else {
                boundary
                    .border_intersections
                    .iter()
                    .flat_map(|chain| chain.0.iter().copied())
                    .collect()
            };
            for point in vertices {
                boundary.add_cutpoint(point);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    use super::super::intersections::IntersectionsComputer;
    use super::*;

    fn square(x0: f64, y0: f64) -> LineString<f64> {
        LineString::new(vec![
            Coord { x: x0, y: y0 },
            Coord { x: x0 + 1.0, y: y0 },
            Coord { x: x0 + 1.0, y: y0 + 1.0 },
            Coord { x: x0, y: y0 + 1.0 },
            Coord { x: x0, y: y0 },
        ])
    }

    #[test]
    fn shared_segment_endpoints_cut_both_boundaries() {
        let mut boundaries = vec![
            Boundary::new(0, square(0.0, 0.0)),
            Boundary::new(1, square(1.0, 0.0)),
        ];
        IntersectionsComputer::new(&mut boundaries).compute_intersections();
        CutpointsComputer::new(&mut boundaries).compute_cutpoints();

        // Both boundaries carry the shared edge's endpoints; each also
        // has its own start vertex (and its neighbor's when it lies on
        // the ring).
        for boundary in &boundaries {
            let cutpoints = boundary.cutpoint_coords();
            assert!(cutpoints.contains(&Coord { x: 1.0, y: 0.0 }));
            assert!(cutpoints.contains(&Coord { x: 1.0, y: 1.0 }));
            assert!(cutpoints.contains(&boundary.line.0[0]));
        }
    }

    #[test]
    fn isolated_boundary_keeps_only_its_start() {
        let mut boundaries = vec![Boundary::new(0, square(0.0, 0.0))];
        IntersectionsComputer::new(&mut boundaries).compute_intersections();
        CutpointsComputer::new(&mut boundaries).compute_cutpoints();
        assert_eq!(boundaries[0].num_cutpoints(), 1);
        assert_eq!(boundaries[0].cutpoint_coords()[0], Coord { x: 0.0, y: 0.0 });
    }

    #[test]
    fn border_pinning_cuts_every_border_vertex() {
        let mut boundaries = vec![
            Boundary::new(0, square(0.0, 0.0)),
            Boundary::new(1, square(1.0, 0.0)),
        ];
        let mut intersections = IntersectionsComputer::new(&mut boundaries);
        intersections.compute_intersections();
        intersections.compute_border_intersections();

        let mut cutpoints = CutpointsComputer::new(&mut boundaries);
        cutpoints.compute_cutpoints();
        cutpoints.compute_border_cutpoints();

        // Every ring vertex of each square lies on the border.
        assert_eq!(boundaries[0].num_cutpoints(), 4);
        assert_eq!(boundaries[1].num_cutpoints(), 4);
    }
}
