//! Cutting a boundary ring into sub-lines at given cutpoints.
//!
//! The ring's coordinates are walked in arc-length order twice (0..L
//! and L..2L) so a segment may wrap through the ring's seam. Each
//! produced segment includes its starting cutpoint, every original
//! vertex strictly between the two cutpoints, and its ending cutpoint.

use geo::{Coord, LineString};

use super::boundary::Boundary;

/// A point paired with its (possibly wrapped) arc-length position.
#[derive(Clone, Copy, Debug)]
struct PositionedPoint {
    point: Coord<f64>,
    position: f64,
}

pub struct BoundaryCutter<'a> {
    boundary: &'a Boundary,
    cutpoints: &'a [Coord<f64>],
}

impl<'a> BoundaryCutter<'a> {
    /// `cutpoints` must be in cyclic arc-length order; to cut a full
    /// ring, pass the cutpoint list with its first element repeated at
    /// the end.
    pub fn new(boundary: &'a Boundary, cutpoints: &'a [Coord<f64>]) -> Self {
        Self {
            boundary,
            cutpoints,
        }
    }

    fn positioned_cutpoints(&self) -> Vec<PositionedPoint> {
        let mut positioned: Vec<PositionedPoint> = Vec::with_capacity(self.cutpoints.len());
        for (i, &point) in self.cutpoints.iter().enumerate() {
            let mut position = self.boundary.point_position(point);
            if i > 0 && position <= positioned[i - 1].position {
                position += self.boundary.length();
                debug_assert!(
                    position > positioned[i - 1].position,
                    "cutpoint positions must increase"
                );
            }
            positioned.push(PositionedPoint { point, position });
        }
        positioned
    }

    fn positioned_coords(&self) -> Vec<PositionedPoint> {
        let length = self.boundary.length();
        let first_lap: Vec<PositionedPoint> = self
            .boundary
            .open_coords()
            .iter()
            .map(|&point| PositionedPoint {
                point,
                position: self.boundary.point_position(point),
            })
            .collect();

        let mut both = first_lap.clone();
        both.extend(first_lap.iter().map(|p| PositionedPoint {
            point: p.point,
            position: p.position + length,
        }));
        if let Some(first) = first_lap.first() {
            both.push(PositionedPoint {
                point: first.point,
                position: 2.0 * length,
            });
        }
        both
    }

    /// Cut the boundary into one sub-line per consecutive cutpoint
    /// pair.
    pub fn cut_boundary(&self) -> Vec<LineString<f64>> {
        let cutpoints = self.positioned_cutpoints();
        let mut segments: Vec<LineString<f64>> = Vec::new();
        let mut current: Option<Vec<Coord<f64>>> = None;
        let mut ci = 0usize;

        for coord in self.positioned_coords() {
            if ci == cutpoints.len() {
                break;
            }
            if coord.position < cutpoints[ci].position {
                if let Some(collected) = current.as_mut() {
                    collected.push(coord.point);
                }
                continue;
            }

            let collected = current.get_or_insert_with(Vec::new);
            while ci < cutpoints.len() && coord.position >= cutpoints[ci].position {
                collected.push(cutpoints[ci].point);
                if ci > 0 {
                    segments.push(LineString::new(std::mem::take(collected)));
                    collected.push(cutpoints[ci].point);
                    let strictly_between = ci + 1 < cutpoints.len()
                        && coord.position > cutpoints[ci].position
                        && coord.position < cutpoints[ci + 1].position;
                    if strictly_between {
                        collected.push(coord.point);
                    }
                }
                ci += 1;
            }
        }

        debug_assert_eq!(
            segments.len() + 1,
            self.cutpoints.len(),
            "expected one fewer segment than input cutpoints"
        );
        segments
    }
}
