#![doc = "Terravec public API"]

//! Converts a categorical geographic raster into simplified, smoothed
//! vector polygons, with polygons that share a boundary staying exactly
//! coincident along it through every geometric operation.

mod blobifier;
mod checkers;
mod cleaner;
mod error;
mod geometry;
mod io;
mod polygonize;
mod raster;
mod segmenter;
mod stitch;
mod tiler;
mod vectorizer;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use raster::{AffineTransform, RasterGrid, RasterSource, NODATA};

#[doc(inline)]
pub use vectorizer::{Vectorizer, VectorizerParams};

#[doc(inline)]
pub use cleaner::{Cleaner, CleanerParams};

#[doc(inline)]
pub use blobifier::Blobifier;

#[doc(inline)]
pub use segmenter::{fix_polygon, Segmenter};

#[doc(inline)]
pub use tiler::{
    Feature, FeatureSet, Pipeline, PipelineParams, StepFn, StepHelper, StepKind, StepParams,
    TileData, TileParams, UnionFn,
};

#[doc(inline)]
pub use io::{read_feature_set, read_grid, write_feature_set, write_grid};

pub use checkers::check_input_path;
