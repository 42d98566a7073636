//! Elects one canonical reference segment per shared geometry.
//!
//! Every segment starts as a candidate for itself. For each shared
//! intersection, the lower-numbered boundary's segments are added as
//! candidates to the matching segments of the higher-numbered one; each
//! segment then takes the candidate with the smallest owning-boundary
//! id as its reference, recording whether its own coordinate order runs
//! with or against the reference.

use geo::{Coord, LineString};

use crate::error::Result;
use crate::geometry::EPSILON;

use super::boundary::Boundary;
use super::segment::{Orientation, SegmentRef};

pub struct ReferencesComputer<'a> {
    boundaries: &'a mut [Boundary],
}

impl<'a> ReferencesComputer<'a> {
    pub fn new(boundaries: &'a mut [Boundary]) -> Self {
        Self { boundaries }
    }

    /// Returns the owned references: segments that are their own
    /// reference, covering every distinct geometry exactly once.
    pub fn compute_references(&mut self) -> Result<Vec<SegmentRef>> {
        self.collect_potential_references()?;
        self.elect_references()?;
        Ok(self.owned_references())
    }

    fn collect_potential_references(&mut self) -> Result<()> {
        // (target boundary, target segment, candidate)
        let mut additions: Vec<(usize, usize, SegmentRef)> = Vec::new();

        for b in 0..self.boundaries.len() {
            let curr = &self.boundaries[b];

            for (&n, _) in &curr.ring_intersections {
                if n <= b {
                    continue; // handled already
                }
                let other = &self.boundaries[n];
                let mut cutpoints = curr.cutpoint_coords();
                cutpoints.push(cutpoints[0]);
                for window in cutpoints.windows(2) {
                    self.match_segment(curr, other, window[0], window[1], &mut additions)?;
                }
            }

            for (&n, chains) in &curr.intersections {
                if n <= b {
                    continue;
                }
                let other = &self.boundaries[n];
                for chain in chains {
                    let relevant = relevant_cutpoints(curr, chain);
                    for window in relevant.windows(2) {
                        self.match_segment(curr, other, window[0], window[1], &mut additions)?;
                    }
                }
            }
        }

        for (boundary, segment, candidate) in additions {
            self.boundaries[boundary].potential_references[segment].push(candidate);
        }
        Ok(())
    }

    /// Find the segment of `curr` between two of its cutpoints and the
    /// matching segment of `other`, and record the former as a
    /// candidate reference for the latter.
    fn match_segment(
        &self,
        curr: &Boundary,
        other: &Boundary,
        start: Coord<f64>,
        end: Coord<f64>,
        additions: &mut Vec<(usize, usize, SegmentRef)>,
    ) -> Result<()> {
        let own_idx = curr.segment_index(start, end).ok_or_else(|| {
            crate::error::Error::Topology(format!(
                "boundary {} lacks the expected segment between its cutpoints",
                curr.idx
            ))
        })?;
        let segment = &curr.segments[own_idx];
        let (other_idx, _) = other.find_segment(start, end, &segment.line)?;
        additions.push((
            other.idx,
            other_idx,
            SegmentRef {
                boundary: curr.idx,
                segment: own_idx,
            },
        ));
        Ok(())
    }

    fn elect_references(&mut self) -> Result<()> {
        let mut updates: Vec<(usize, usize, SegmentRef, Orientation)> = Vec::new();

        for b in 0..self.boundaries.len() {
            let boundary = &self.boundaries[b];
            for (i, candidates) in boundary.potential_references.iter().enumerate() {
                let chosen = *candidates
                    .iter()
                    .min_by_key(|r| r.boundary)
                    .expect("every segment is a candidate for itself");
                let own = SegmentRef {
                    boundary: b,
                    segment: i,
                };
                let orientation = if chosen == own {
                    Orientation::Forward
                } else {
                    let reference = &self.boundaries[chosen.boundary].segments[chosen.segment];
                    let (_, orientation) =
                        boundary.find_segment(reference.start, reference.end, &reference.line)?;
                    orientation
                };
                updates.push((b, i, chosen, orientation));
            }
        }

        for (b, i, reference, orientation) in updates {
            let segment = &mut self.boundaries[b].segments[i];
            segment.reference = reference;
            segment.orientation = orientation;
        }
        Ok(())
    }

    fn owned_references(&self) -> Vec<SegmentRef> {
        let mut owned = Vec::new();
        for boundary in self.boundaries.iter() {
            for (i, segment) in boundary.segments.iter().enumerate() {
                let own = SegmentRef {
                    boundary: boundary.idx,
                    segment: i,
                };
                if segment.reference == own {
                    owned.push(own);
                }
            }
        }
        owned
    }
}

/// The cutpoints of `boundary` lying within the chain's span, walking
/// forward from the chain's start to its end (the chain is oriented
/// along the boundary). Used to split one shared intersection into
/// per-segment pieces.
fn relevant_cutpoints(boundary: &Boundary, chain: &LineString<f64>) -> Vec<Coord<f64>> {
    let start = chain.0[0];
    let end = *chain.0.last().expect("chain has coordinates");
    let length = boundary.length();

    let pos_start = boundary.point_position(start);
    let mut pos_end = boundary.point_position(end);
    if pos_end <= pos_start {
        pos_end += length;
    }

    let positioned = boundary.cutpoints_with_positions();
    let mut within: Vec<(Coord<f64>, f64)> = Vec::new();
    for lap in 0..2 {
        for &(coord, position) in &positioned {
            let wrapped = position + lap as f64 * length;
            if wrapped >= pos_start - EPSILON && wrapped <= pos_end + EPSILON {
                within.push((coord, wrapped));
            }
        }
    }
    within.sort_by(|a, b| a.1.total_cmp(&b.1));
    within.into_iter().map(|(coord, _)| coord).collect()
}
