mod grid;
mod transform;

pub use grid::{RasterGrid, RasterSource, NODATA};
pub use transform::AffineTransform;
