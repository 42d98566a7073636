use geo::Polygon;

/// One source polygon together with the boundaries it decomposes into.
/// The identity is immutable; only `modified_polygon` changes when the
/// boundaries are rebuilt.
#[derive(Clone, Debug)]
pub struct Area {
    pub polygon: Polygon<f64>,
    /// Boundary index of the exterior ring.
    pub exterior: usize,
    /// Boundary indices of the interior rings.
    pub interiors: Vec<usize>,
    pub modified_polygon: Option<Polygon<f64>>,
}

impl Area {
    pub fn new(polygon: Polygon<f64>) -> Self {
        Self {
            polygon,
            exterior: 0,
            interiors: Vec::new(),
            modified_polygon: None,
        }
    }
}
