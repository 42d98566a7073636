//! The polygon-boundary topology engine.
//!
//! A set of polygons is decomposed into areas (one per polygon) and
//! boundaries (one per ring). Boundaries are intersected pairwise, cut
//! at cutpoints into segments, and every segment is tied to a single
//! canonical reference. A geometric operation applied through the
//! references is replicated identically to every polygon sharing a
//! segment, which keeps neighboring polygons exactly coincident along
//! shared borders through simplification and smoothing.
//!
//! Cyclic relationships are held in an index arena: areas and
//! boundaries live in flat vectors, and cross-references are integer
//! indices.

mod area;
mod boundary;
mod cutpoints;
mod cutter;
mod fix;
mod intersections;
mod mapping;
mod references;
mod segment;

pub use area::Area;
pub use boundary::Boundary;
pub use fix::fix_polygon;
pub use segment::{Orientation, Segment, SegmentRef};

use geo::{Area as GeoArea, BooleanOps, LineString, MultiPolygon, Polygon};
use log::warn;

use crate::error::{Error, Result};
use crate::geometry::{remove_collinear, rings_equal_cyclic};

use cutpoints::CutpointsComputer;
use intersections::IntersectionsComputer;
use mapping::MappingComputer;
use references::ReferencesComputer;

pub struct Segmenter {
    labels: Vec<i32>,
    areas: Vec<Area>,
    boundaries: Vec<Boundary>,
    references: Vec<SegmentRef>,
    pin_border: bool,
    border: Option<LineString<f64>>,
}

impl Segmenter {
    /// Decompose the polygons and elect references. With `pin_border`,
    /// the outer border of the polygons' union is additionally cut at
    /// every vertex so later operations cannot move it.
    pub fn build(polygons: Vec<Polygon<f64>>, labels: Vec<i32>, pin_border: bool) -> Result<Self> {
        assert_eq!(polygons.len(), labels.len());

        let border = if pin_border {
            build_border(&polygons)
        } else {
            None
        };

        let mut areas: Vec<Area> = Vec::with_capacity(polygons.len());
        let mut boundaries: Vec<Boundary> = Vec::new();
        for polygon in polygons {
            let mut area = Area::new(polygon);
            area.exterior = boundaries.len();
            boundaries.push(Boundary::new(
                boundaries.len(),
                area.polygon.exterior().clone(),
            ));
            area.interiors = area
                .polygon
                .interiors()
                .iter()
                .map(|ring| {
                    boundaries.push(Boundary::new(boundaries.len(), ring.clone()));
                    boundaries.len() - 1
                })
                .collect();
            areas.push(area);
        }

        let mut intersections = IntersectionsComputer::new(&mut boundaries);
        intersections.compute_intersections();
        if pin_border {
            intersections.compute_border_intersections();
        }

        let mut cutpoints = CutpointsComputer::new(&mut boundaries);
        cutpoints.compute_cutpoints();
        if pin_border {
            cutpoints.compute_border_cutpoints();
        }

        MappingComputer::new(&mut boundaries).compute_mapping();
        let references = ReferencesComputer::new(&mut boundaries).compute_references()?;

        Ok(Self {
            labels,
            areas,
            boundaries,
            references,
            pin_border,
            border,
        })
    }

    /// Number of owned reference segments.
    #[inline]
    pub fn num_references(&self) -> usize {
        self.references.len()
    }

    /// Apply an operation to every owned reference segment, feeding it
    /// the segment's current modified line.
    pub fn run_per_segment<F>(&mut self, op: F)
    where
        F: Fn(&LineString<f64>) -> LineString<f64>,
    {
        for i in 0..self.references.len() {
            let reference = self.references[i];
            let segment = &mut self.boundaries[reference.boundary].segments[reference.segment];
            segment.modified_line = op(&segment.modified_line);
        }
    }

    /// Rebuild all polygons from the modified reference segments and
    /// return them with their labels. With `pin_border`, the union of
    /// the results is checked against the pinned border; a mismatch is
    /// logged and tolerated.
    pub fn into_result(mut self) -> Result<(Vec<Polygon<f64>>, Vec<i32>)> {
        self.rebuild();

        let polygons: Vec<Polygon<f64>> = self
            .areas
            .iter()
            .map(|area| {
                area.modified_polygon
                    .clone()
                    .expect("area was rebuilt")
            })
            .collect();

        if self.pin_border {
            if let Err(e) = self.check_border(&polygons) {
                warn!("{e}");
            }
        }
        Ok((polygons, self.labels))
    }

    /// Propagate reference lines to every sharing segment, then
    /// reassemble rings and polygons.
    fn rebuild(&mut self) {
        // Resolve each segment's modified line through its reference.
        let mut resolved: Vec<(usize, usize, LineString<f64>)> = Vec::new();
        for (b, boundary) in self.boundaries.iter().enumerate() {
            for (s, segment) in boundary.segments.iter().enumerate() {
                let reference = segment.reference;
                if (reference.boundary, reference.segment) == (b, s) {
                    continue;
                }
                let line = &self.boundaries[reference.boundary].segments[reference.segment]
                    .modified_line;
                let line = match segment.orientation {
                    Orientation::Forward => line.clone(),
                    Orientation::Backward => {
                        LineString::new(line.0.iter().rev().copied().collect())
                    }
                };
                resolved.push((b, s, line));
            }
        }
        for (b, s, line) in resolved {
            self.boundaries[b].segments[s].modified_line = line;
        }

        for boundary in &mut self.boundaries {
            boundary.rebuild();
        }
        for area in &mut self.areas {
            let exterior = self.boundaries[area.exterior]
                .modified_line
                .clone()
                .expect("boundary was rebuilt");
            let interiors: Vec<LineString<f64>> = area
                .interiors
                .iter()
                .map(|&i| {
                    self.boundaries[i]
                        .modified_line
                        .clone()
                        .expect("boundary was rebuilt")
                })
                .collect();
            area.modified_polygon = Some(Polygon::new(exterior, interiors));
        }
    }

    /// The union of the rebuilt polygons must still trace the pinned
    /// border exactly.
    fn check_border(&self, polygons: &[Polygon<f64>]) -> Result<()> {
        let Some(border) = &self.border else {
            return Ok(());
        };
        let Some(union) = union_all(polygons) else {
            return Ok(());
        };
        if union.0.len() != 1 {
            return Err(Error::Topology(format!(
                "union of modified polygons has {} parts, expected one",
                union.0.len()
            )));
        }
        if !rings_equal_cyclic(union.0[0].exterior(), border) {
            return Err(Error::Topology(
                "union of modified polygons does not trace the pinned border".to_string(),
            ));
        }
        Ok(())
    }
}

/// Union all polygons and keep the exterior of the largest part with
/// collinear vertices removed: the pinned border.
fn build_border(polygons: &[Polygon<f64>]) -> Option<LineString<f64>> {
    let union = union_all(polygons)?;
    let largest = union
        .0
        .iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))?;
    if union.0.len() != 1 {
        warn!(
            "union of input polygons has {} parts; pinning the largest",
            union.0.len()
        );
    }
    Some(remove_collinear(largest.exterior()))
}

fn union_all(polygons: &[Polygon<f64>]) -> Option<MultiPolygon<f64>> {
    polygons
        .iter()
        .map(|p| MultiPolygon::new(vec![p.clone()]))
        .reduce(|a, b| a.union(&b))
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, Polygon};

    use super::Segmenter;
    use crate::geometry::{simplify_segment, smooth_segment};

    fn square(x0: f64, y0: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: x0, y: y0 },
                Coord { x: x0 + size, y: y0 },
                Coord {
                    x: x0 + size,
                    y: y0 + size,
                },
                Coord { x: x0, y: y0 + size },
                Coord { x: x0, y: y0 },
            ]),
            vec![],
        )
    }

    #[test]
    fn identity_rebuild_returns_the_input() {
        let polygons = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)];
        let segmenter = Segmenter::build(polygons.clone(), vec![1, 2], false).unwrap();
        let (result, labels) = segmenter.into_result().unwrap();
        assert_eq!(labels, vec![1, 2]);
        for (output, input) in result.iter().zip(&polygons) {
            assert!(crate::geometry::rings_equal_cyclic(
                output.exterior(),
                input.exterior()
            ));
        }
    }

    #[test]
    fn shared_borders_stay_coincident_through_operations() {
        let polygons = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)];
        let mut segmenter = Segmenter::build(polygons, vec![1, 2], false).unwrap();
        segmenter.run_per_segment(|line| simplify_segment(line, 0.5));
        segmenter.run_per_segment(|line| smooth_segment(line, 2));
        let (result, _) = segmenter.into_result().unwrap();

        // Collect each polygon's coordinates along x = 1: they must be
        // identical point sets, coordinate by coordinate.
        let shared_of = |polygon: &Polygon<f64>| -> Vec<(f64, f64)> {
            let mut coords: Vec<(f64, f64)> = polygon
                .exterior()
                .0
                .iter()
                .filter(|c| (c.x - 1.0).abs() < 1.0e-9)
                .map(|c| (c.x, c.y))
                .collect();
            coords.sort_by(|a, b| a.partial_cmp(b).unwrap());
            coords
        };
        let left = shared_of(&result[0]);
        let right = shared_of(&result[1]);
        assert!(!left.is_empty());
        assert_eq!(left, right);
    }

    #[test]
    fn per_segment_operations_preserve_endpoints() {
        let polygons = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)];
        let mut segmenter = Segmenter::build(polygons.clone(), vec![1, 2], false).unwrap();
        segmenter.run_per_segment(|line| smooth_segment(line, 3));
        let (result, _) = segmenter.into_result().unwrap();

        // Cutpoints (ring corners at the shared edge) survive exactly.
        for polygon in &result {
            let coords = &polygon.exterior().0;
            assert!(coords.contains(&Coord { x: 1.0, y: 0.0 }));
            assert!(coords.contains(&Coord { x: 1.0, y: 1.0 }));
        }
    }

    #[test]
    fn pinned_border_survives_smoothing() {
        let polygons = vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)];
        let mut segmenter = Segmenter::build(polygons, vec![1, 2], true).unwrap();
        segmenter.run_per_segment(|line| simplify_segment(line, 10.0));
        segmenter.run_per_segment(|line| smooth_segment(line, 3));
        let (result, _) = segmenter.into_result().unwrap();

        // With the border pinned, every original corner vertex is a
        // cutpoint, so outer rings cannot move at all.
        let all_on_lattice = result.iter().all(|polygon| {
            polygon.exterior().0.iter().all(|c| {
                (c.x - c.x.round()).abs() < 1.0e-9 && (c.y - c.y.round()).abs() < 1.0e-9
            })
        });
        assert!(all_on_lattice);
    }
}
