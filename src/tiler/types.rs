use std::fmt;

use geo::Polygon;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One rectangle of the fixed tile grid, in pixels. `x` runs along grid
/// rows and `y` along columns. Edge tiles keep their nominal extent;
/// readers clip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileParams {
    pub start_x: usize,
    pub start_y: usize,
    pub width: usize,
    pub height: usize,
}

impl TileParams {
    pub fn new(start_x: usize, start_y: usize, width: usize, height: usize) -> Self {
        Self {
            start_x,
            start_y,
            width,
            height,
        }
    }

    #[inline]
    pub fn end_x(&self) -> usize {
        self.start_x + self.width
    }

    #[inline]
    pub fn end_y(&self) -> usize {
        self.start_y + self.height
    }
}

impl fmt::Display for TileParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] ({},{})",
            self.start_x, self.start_y, self.width, self.height
        )
    }
}

/// The kind of artifact a step produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    Raster,
    Vector,
}

/// A named stage of the pipeline with a declared output kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepParams {
    name: String,
    kind: StepKind,
}

impl StepParams {
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> StepKind {
        self.kind
    }

    /// File extension for persisted artifacts of this step.
    pub fn file_extension(&self) -> &'static str {
        match self.kind {
            StepKind::Raster => "bin",
            StepKind::Vector => "geojson",
        }
    }
}

/// One labeled polygon of a vector tile.
#[derive(Clone, Debug)]
pub struct Feature {
    pub polygon: Polygon<f64>,
    pub label: i32,
}

/// The payload of a vector-typed step for one tile.
#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// The artifact stored for one (step, tile) pair.
#[derive(Clone, Debug)]
pub enum TileData {
    Raster(Array2<i32>),
    Vector(FeatureSet),
}

impl TileData {
    pub fn kind(&self) -> StepKind {
        match self {
            TileData::Raster(_) => StepKind::Raster,
            TileData::Vector(_) => StepKind::Vector,
        }
    }

    pub fn as_raster(&self) -> Option<&Array2<i32>> {
        match self {
            TileData::Raster(data) => Some(data),
            TileData::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&FeatureSet> {
        match self {
            TileData::Vector(set) => Some(set),
            TileData::Raster(_) => None,
        }
    }

    pub fn into_raster(self) -> Option<Array2<i32>> {
        match self {
            TileData::Raster(data) => Some(data),
            TileData::Vector(_) => None,
        }
    }

    pub fn into_vector(self) -> Option<FeatureSet> {
        match self {
            TileData::Vector(set) => Some(set),
            TileData::Raster(_) => None,
        }
    }
}
