//! One polygon ring and everything the segmenter tracks about it: the
//! arc-length cache, the edge R-tree for off-vertex points, recorded
//! intersections with other boundaries, the ordered cutpoint set, and
//! the segments produced by cutting.

use std::collections::BTreeMap;

use ahash::AHashMap;
use geo::{Coord, LineString};
use rstar::primitives::{GeomWithData, Line as EdgeLine};
use rstar::RTree;

use crate::error::{Error, Result};
use crate::geometry::{lines_equal, lines_equal_reversed, QCoord, EPSILON};

use super::segment::{Orientation, Segment, SegmentRef};

/// Arc-length position used as the sort key for cutpoints. Ordered by
/// `f64::total_cmp`; positions within [`EPSILON`] are collapsed at
/// insertion time, never by key comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ArcPos(f64);

impl Eq for ArcPos {}

impl PartialOrd for ArcPos {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArcPos {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

type IndexedEdge = GeomWithData<EdgeLine<[f64; 2]>, usize>;

pub struct Boundary {
    /// Identity, unique across all boundaries of a tile.
    pub idx: usize,
    /// The original ring; first coordinate equals the last.
    pub line: LineString<f64>,
    length: f64,
    /// Cumulative arc length per ring vertex.
    cumulative: Vec<f64>,
    /// Quantized vertex -> arc-length position of its first occurrence.
    vertex_position: AHashMap<QCoord, f64>,
    /// R-tree over ring edges, for locating off-vertex points.
    edge_index: RTree<IndexedEdge>,

    /// Neighbor boundary id -> the single closed intersection line, for
    /// the case where the entire ring coincides with the neighbor.
    pub ring_intersections: AHashMap<usize, LineString<f64>>,
    /// Neighbor boundary id -> open intersection segments shared with
    /// that neighbor, oriented along this boundary's direction.
    pub intersections: AHashMap<usize, Vec<LineString<f64>>>,
    /// Portions of this ring lying on the pinned outer border.
    pub border_intersections: Vec<LineString<f64>>,

    cutpoints: BTreeMap<ArcPos, Coord<f64>>,

    pub segments: Vec<Segment>,
    /// (start, end) -> segment index, quantized.
    segment_map: AHashMap<(QCoord, QCoord), usize>,
    /// Per segment, the candidate reference segments collected from
    /// other boundaries that share the same geometry.
    pub potential_references: Vec<Vec<SegmentRef>>,

    pub modified_line: Option<LineString<f64>>,
}

impl Boundary {
    pub fn new(idx: usize, line: LineString<f64>) -> Self {
        let coords = &line.0;
        let mut cumulative = Vec::with_capacity(coords.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in coords.windows(2) {
            total += f64::hypot(pair[1].x - pair[0].x, pair[1].y - pair[0].y);
            cumulative.push(total);
        }

        let mut vertex_position = AHashMap::with_capacity(coords.len());
        for (i, &coord) in coords.iter().take(coords.len().saturating_sub(1)).enumerate() {
            vertex_position
                .entry(QCoord::new(coord))
                .or_insert(cumulative[i]);
        }

        let edges: Vec<IndexedEdge> = coords
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                GeomWithData::new(
                    EdgeLine::new([pair[0].x, pair[0].y], [pair[1].x, pair[1].y]),
                    i,
                )
            })
            .collect();

        Self {
            idx,
            length: total,
            cumulative,
            vertex_position,
            edge_index: RTree::bulk_load(edges),
            line,
            ring_intersections: AHashMap::new(),
            intersections: AHashMap::new(),
            border_intersections: Vec::new(),
            cutpoints: BTreeMap::new(),
            segments: Vec::new(),
            segment_map: AHashMap::new(),
            potential_references: Vec::new(),
            modified_line: None,
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Ring coordinates without the duplicated closing vertex.
    pub fn open_coords(&self) -> &[Coord<f64>] {
        &self.line.0[..self.line.0.len().saturating_sub(1)]
    }

    /// Arc-length position of a point on this ring, in [0, length).
    /// Off-vertex points are projected onto the nearest ring edge.
    pub fn point_position(&self, point: Coord<f64>) -> f64 {
        if let Some(&position) = self.vertex_position.get(&QCoord::new(point)) {
            return position;
        }

        let position = match self.edge_index.nearest_neighbor(&[point.x, point.y]) {
            Some(edge) => {
                let i = edge.data;
                let a = self.line.0[i];
                let b = self.line.0[i + 1];
                self.cumulative[i] + project_along(a, b, point)
            }
            None => 0.0,
        };
        if self.length - position < EPSILON {
            0.0
        } else {
            position
        }
    }

    /// Whether the point lies on the ring (vertex or edge interior).
    pub fn on_boundary(&self, point: Coord<f64>) -> bool {
        if self.vertex_position.contains_key(&QCoord::new(point)) {
            return true;
        }
        match self.edge_index.nearest_neighbor(&[point.x, point.y]) {
            Some(edge) => {
                let i = edge.data;
                distance_to_edge(self.line.0[i], self.line.0[i + 1], point) < EPSILON
            }
            None => false,
        }
    }

    /// Insert a cutpoint keyed by its arc-length position. Two points
    /// at equal position (within tolerance) collapse to one cutpoint.
    pub fn add_cutpoint(&mut self, point: Coord<f64>) {
        let position = self.point_position(point);
        let nearby = self
            .cutpoints
            .range(ArcPos(position - EPSILON)..=ArcPos(position + EPSILON))
            .next()
            .is_some();
        if !nearby {
            self.cutpoints.insert(ArcPos(position), point);
        }
    }

    /// Cutpoints in arc-length order.
    pub fn cutpoint_coords(&self) -> Vec<Coord<f64>> {
        self.cutpoints.values().copied().collect()
    }

    /// Cutpoints with their positions, in arc-length order.
    pub fn cutpoints_with_positions(&self) -> Vec<(Coord<f64>, f64)> {
        self.cutpoints.iter().map(|(k, &v)| (v, k.0)).collect()
    }

    #[inline]
    pub fn num_cutpoints(&self) -> usize {
        self.cutpoints.len()
    }

    /// Install the segments produced by cutting, and initialize each
    /// segment's candidate list with itself.
    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        assert_eq!(
            segments.len(),
            self.cutpoints.len(),
            "number of segments must equal number of cutpoints"
        );
        self.segment_map = segments
            .iter()
            .enumerate()
            .map(|(i, s)| ((QCoord::new(s.start), QCoord::new(s.end)), i))
            .collect();
        self.potential_references = (0..segments.len())
            .map(|segment| {
                vec![SegmentRef {
                    boundary: self.idx,
                    segment,
                }]
            })
            .collect();
        self.segments = segments;
    }

    /// Exact directional lookup of a segment by its endpoints.
    pub fn segment_index(&self, start: Coord<f64>, end: Coord<f64>) -> Option<usize> {
        self.segment_map
            .get(&(QCoord::new(start), QCoord::new(end)))
            .copied()
    }

    /// Locate the segment matching the given endpoints and line, and
    /// the orientation of that line relative to the stored segment.
    ///
    /// With exactly one segment the ring was never cut (start = end);
    /// with exactly two, both segments span the same pair of cutpoints
    /// and the (start, end) key alone is ambiguous, so the geometry
    /// decides.
    pub fn find_segment(
        &self,
        start: Coord<f64>,
        end: Coord<f64>,
        line: &LineString<f64>,
    ) -> Result<(usize, Orientation)> {
        let forward_key = (QCoord::new(start), QCoord::new(end));
        let backward_key = (QCoord::new(end), QCoord::new(start));
        let missing = || {
            Error::Topology(format!(
                "boundary {} has no segment between ({:.3}, {:.3}) and ({:.3}, {:.3})",
                self.idx, start.x, start.y, end.x, end.y
            ))
        };

        match self.segments.len() {
            0 => Err(missing()),
            1 => {
                if self.segment_map.contains_key(&forward_key) {
                    Ok((0, Orientation::Forward))
                } else {
                    Err(missing())
                }
            }
            2 => {
                let first = *self.segment_map.get(&forward_key).ok_or_else(missing)?;
                let second = *self.segment_map.get(&backward_key).ok_or_else(missing)?;
                if lines_equal(&self.segments[first].line, line) {
                    Ok((first, Orientation::Forward))
                } else if lines_equal_reversed(&self.segments[second].line, line) {
                    Ok((second, Orientation::Backward))
                } else if lines_equal_reversed(&self.segments[first].line, line) {
                    Ok((first, Orientation::Backward))
                } else if lines_equal(&self.segments[second].line, line) {
                    Ok((second, Orientation::Forward))
                } else {
                    Err(missing())
                }
            }
            _ => {
                if let Some(&i) = self.segment_map.get(&forward_key) {
                    Ok((i, Orientation::Forward))
                } else if let Some(&i) = self.segment_map.get(&backward_key) {
                    Ok((i, Orientation::Backward))
                } else {
                    Err(missing())
                }
            }
        }
    }

    /// Reassemble the ring from the segments' modified lines. Segment
    /// endpoints are shared, so each segment contributes everything but
    /// its last coordinate.
    pub fn rebuild(&mut self) {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        for segment in &self.segments {
            let line = &segment.modified_line.0;
            coords.extend_from_slice(&line[..line.len() - 1]);
        }
        if let Some(last) = self.segments.last() {
            if let Some(&end) = last.modified_line.0.last() {
                coords.push(end);
            }
        }
        self.modified_line = Some(LineString::new(coords));
    }
}

/// Distance from the edge start to the projection of `point` onto the
/// edge (a, b), clamped to the edge.
fn project_along(a: Coord<f64>, b: Coord<f64>, point: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return 0.0;
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    t * len2.sqrt()
}

fn distance_to_edge(a: Coord<f64>, b: Coord<f64>, point: Coord<f64>) -> f64 {
    let along = project_along(a, b, point);
    let len = f64::hypot(b.x - a.x, b.y - a.y);
    let t = if len == 0.0 { 0.0 } else { along / len };
    let proj = Coord {
        x: a.x + t * (b.x - a.x),
        y: a.y + t * (b.y - a.y),
    };
    f64::hypot(point.x - proj.x, point.y - proj.y)
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString};

    use super::*;

    fn unit_square() -> LineString<f64> {
        LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
            Coord { x: 0.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ])
    }

    #[test]
    fn vertex_positions_accumulate_arc_length() {
        let boundary = Boundary::new(0, unit_square());
        assert_eq!(boundary.length(), 4.0);
        assert_eq!(boundary.point_position(Coord { x: 0.0, y: 0.0 }), 0.0);
        assert_eq!(boundary.point_position(Coord { x: 1.0, y: 0.0 }), 1.0);
        assert_eq!(boundary.point_position(Coord { x: 0.0, y: 1.0 }), 3.0);
    }

    #[test]
    fn off_vertex_points_project_onto_edges() {
        let boundary = Boundary::new(0, unit_square());
        let position = boundary.point_position(Coord { x: 1.0, y: 0.25 });
        assert!((position - 1.25).abs() < 1.0e-9);
    }

    #[test]
    fn on_boundary_accepts_edge_interior_and_rejects_outside() {
        let boundary = Boundary::new(0, unit_square());
        assert!(boundary.on_boundary(Coord { x: 0.5, y: 0.0 }));
        assert!(boundary.on_boundary(Coord { x: 0.0, y: 0.0 }));
        assert!(!boundary.on_boundary(Coord { x: 0.5, y: 0.5 }));
    }

    #[test]
    fn duplicate_cutpoints_collapse() {
        let mut boundary = Boundary::new(0, unit_square());
        boundary.add_cutpoint(Coord { x: 0.0, y: 0.0 });
        boundary.add_cutpoint(Coord { x: 1.0, y: 0.0 });
        boundary.add_cutpoint(Coord {
            x: 1.0 + 1.0e-12,
            y: 0.0,
        });
        assert_eq!(boundary.num_cutpoints(), 2);
        let coords = boundary.cutpoint_coords();
        assert_eq!(coords[0], Coord { x: 0.0, y: 0.0 });
        assert_eq!(coords[1], Coord { x: 1.0, y: 0.0 });
    }
}
