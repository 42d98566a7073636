use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::AffineTransform;
use crate::tiler::TileParams;

/// Sentinel for invalid pixels. Valid labels are non-negative.
pub const NODATA: i32 = -1;

/// Anything the pipeline can pull input tiles from.
///
/// Raster file formats (GeoTIFF etc.) are decoded by external tooling;
/// the pipeline only ever reads through this trait.
///
/// Axis convention: tile coordinate `x` runs along grid axis 0 (rows)
/// and `y` along axis 1 (columns), so `width` counts rows and `height`
/// counts columns.
pub trait RasterSource: Send + Sync {
    /// Extent along tile axis x (grid rows).
    fn width(&self) -> usize;

    /// Extent along tile axis y (grid columns).
    fn height(&self) -> usize;

    fn transform(&self) -> AffineTransform;

    /// Read the window covered by `tile`, clipped to the raster bounds.
    /// The returned array may be smaller than the requested tile.
    fn read_window(&self, tile: &TileParams) -> Result<Array2<i32>>;
}

/// A single-band categorical raster held in memory: integer labels, an
/// affine world transform, and the `NODATA` sentinel convention.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RasterGrid {
    data: Array2<i32>,
    transform: AffineTransform,
}

impl RasterGrid {
    pub fn new(data: Array2<i32>, transform: AffineTransform) -> Self {
        Self { data, transform }
    }

    #[inline]
    pub fn data(&self) -> &Array2<i32> {
        &self.data
    }

    #[inline]
    pub fn into_data(self) -> Array2<i32> {
        self.data
    }
}

impl RasterSource for RasterGrid {
    #[inline]
    fn width(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    fn height(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    fn transform(&self) -> AffineTransform {
        self.transform
    }

    fn read_window(&self, tile: &TileParams) -> Result<Array2<i32>> {
        let x0 = tile.start_x.min(self.width());
        let y0 = tile.start_y.min(self.height());
        let x1 = (tile.start_x + tile.width).min(self.width());
        let y1 = (tile.start_y + tile.height).min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return Err(Error::Input(format!(
                "window {tile} lies outside the {}x{} raster",
                self.width(),
                self.height()
            )));
        }
        Ok(self.data.slice(s![x0..x1, y0..y1]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn read_window_clips_to_bounds() {
        let grid = RasterGrid::new(
            array![[1, 2, 3], [4, 5, 6], [7, 8, 9]],
            AffineTransform::identity(),
        );
        let tile = TileParams::new(1, 1, 5, 5);
        let window = grid.read_window(&tile).unwrap();
        assert_eq!(window, array![[5, 6], [8, 9]]);
    }

    #[test]
    fn read_window_outside_errors() {
        let grid = RasterGrid::new(array![[1, 2], [3, 4]], AffineTransform::identity());
        let tile = TileParams::new(4, 0, 2, 2);
        assert!(grid.read_window(&tile).is_err());
    }
}
