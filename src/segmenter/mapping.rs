//! Cuts every boundary into segments at its cutpoints and installs the
//! (start, end) -> segment lookup.

use super::boundary::Boundary;
use super::cutter::BoundaryCutter;
use super::segment::{Segment, SegmentRef};

pub struct MappingComputer<'a> {
    boundaries: &'a mut [Boundary],
}

impl<'a> MappingComputer<'a> {
    pub fn new(boundaries: &'a mut [Boundary]) -> Self {
        Self { boundaries }
    }

    /// Produce exactly one segment per cutpoint: segment i runs from
    /// cutpoint i to cutpoint i+1, cyclically.
    pub fn compute_mapping(&mut self) {
        for boundary in self.boundaries.iter_mut() {
            let mut cutpoints = boundary.cutpoint_coords();
            assert!(
                !cutpoints.is_empty(),
                "boundary {} has no cutpoints",
                boundary.idx
            );
            cutpoints.push(cutpoints[0]);

            let segment_lines = BoundaryCutter::new(boundary, &cutpoints).cut_boundary();
            let segments: Vec<Segment> = segment_lines
                .into_iter()
                .enumerate()
                .map(|(i, line)| {
                    Segment::new(
                        SegmentRef {
                            boundary: boundary.idx,
                            segment: i,
                        },
                        line,
                    )
                })
                .collect();
            boundary.set_segments(segments);
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    use super::super::cutpoints::CutpointsComputer;
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
    fn segment_count_equals_cutpoint_count() {
        let mut boundaries = vec![
            Boundary::new(0, square(0.0, 0.0)),
            Boundary::new(1, square(1.0, 0.0)),
        ];
        IntersectionsComputer::new(&mut boundaries).compute_intersections();
        CutpointsComputer::new(&mut boundaries).compute_cutpoints();
        MappingComputer::new(&mut boundaries).compute_mapping();

        for boundary in &boundaries {
            assert_eq!(boundary.segments.len(), boundary.num_cutpoints());
            // Every segment's endpoints are cutpoints of this boundary.
            let cutpoints = boundary.cutpoint_coords();
            for segment in &boundary.segments {
                assert!(cutpoints.contains(&segment.start));
                assert!(cutpoints.contains(&segment.end));
            }
        }
    }

    #[test]
    fn uncut_boundary_becomes_one_ring_segment() {
        let mut boundaries = vec![Boundary::new(0, square(0.0, 0.0))];
        IntersectionsComputer::new(&mut boundaries).compute_intersections();
        CutpointsComputer::new(&mut boundaries).compute_cutpoints();
        MappingComputer::new(&mut boundaries).compute_mapping();

        let boundary = &boundaries[0];
        assert_eq!(boundary.segments.len(), 1);
        let segment = &boundary.segments[0];
        assert_eq!(segment.start, segment.end);
        assert_eq!(segment.line.0.len(), 5);
    }
}
