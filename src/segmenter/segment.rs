use geo::{Coord, LineString};

/// Direction of a segment relative to its reference segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Backward,
}

/// Arena address of a segment: (boundary index, segment index).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentRef {
    pub boundary: usize,
    pub segment: usize,
}

/// A maximal sub-arc of a boundary between two consecutive cutpoints.
///
/// Exactly one segment per shared geometry is the *reference*; per-
/// segment operations touch only references, and every other segment
/// copies the reference's `modified_line` (reversed when oriented
/// backward) during rebuild.
#[derive(Clone, Debug)]
pub struct Segment {
    pub line: LineString<f64>,
    pub start: Coord<f64>,
    pub end: Coord<f64>,
    /// Iteratively updated by per-segment operations.
    pub modified_line: LineString<f64>,
    /// The canonical segment for this geometry; fixed once elected.
    pub reference: SegmentRef,
    pub orientation: Orientation,
}

impl Segment {
    /// A fresh segment referencing itself.
    pub fn new(owner: SegmentRef, line: LineString<f64>) -> Self {
        let start = line.0[0];
        let end = *line.0.last().expect("segment line has coordinates");
        Self {
            modified_line: line.clone(),
            line,
            start,
            end,
            reference: owner,
            orientation: Orientation::Forward,
        }
    }
}
