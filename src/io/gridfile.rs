//! Reading and writing of `.grid` raster files (bincode-serialized
//! [`RasterGrid`]). Conversion from georeferenced formats such as
//! GeoTIFF is handled by external tooling.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::raster::RasterGrid;

pub fn read_grid(path: &Path) -> Result<RasterGrid> {
    let bytes = fs::read(path).map_err(|e| Error::Input(format!("{}: {e}", path.display())))?;
    bincode::deserialize(&bytes).map_err(|e| Error::Input(format!("{}: {e}", path.display())))
}

pub fn write_grid(path: &Path, grid: &RasterGrid) -> Result<()> {
    let bytes = bincode::serialize(grid).map_err(|e| Error::Serialize(e.to_string()))?;
    fs::write(path, bytes).map_err(|e| Error::TileIo {
        path: path.to_path_buf(),
        source: e,
    })
}
