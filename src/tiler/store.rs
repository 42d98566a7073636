//! Intermediate-tile persistence, keyed by (step, tile).
//!
//! The memory backend is a plain map behind a mutex and is only used
//! where workers cannot race on it (sequential step-wise runs, or
//! independent mode where each tile owns a private store). The disk
//! backend persists artifacts under the working directory with
//! filenames encoding step and tile, writes atomically via a temporary
//! name, and tolerates missing files by reporting the tile as absent.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use ahash::AHashMap;
use log::warn;
use ndarray::{s, Array2};

use crate::error::{Error, Result};
use crate::io;

use super::config::tile_grid;
use super::{StepKind, StepParams, TileData, TileParams};

/// Label property name used inside intermediate vector tiles. The
/// user-facing name only applies to the final output.
const TILE_LABEL: &str = "label";

pub trait TileStore: Send + Sync {
    /// (width, height, tile_size) of the fixed tile grid.
    fn grid_dims(&self) -> (usize, usize, usize);

    fn has_tile(&self, step: &StepParams, tile: &TileParams) -> bool;

    /// Read a stored artifact; absent tiles are `None`, not errors.
    fn get_tile(&self, step: &StepParams, tile: &TileParams) -> Result<Option<TileData>>;

    fn save_tile(&self, step: &StepParams, tile: &TileParams, data: TileData) -> Result<()>;

    /// Every stored tile of a step, in unspecified order.
    fn get_all_tiles(&self, step: &StepParams) -> Result<Vec<(TileParams, TileData)>>;

    /// Assemble an arbitrary pixel rectangle from every stored tile
    /// overlapping it. Raster steps only; the rectangle is zero-filled
    /// where nothing is stored.
    fn get_region(&self, step: &StepParams, region: &TileParams) -> Result<Array2<i32>> {
        assert!(
            step.kind() == StepKind::Raster,
            "get_region only works on raster steps"
        );
        let (width, height, tile_size) = self.grid_dims();
        let mut data = Array2::<i32>::zeros((region.width, region.height));

        for tile in tile_grid(width, height, tile_size) {
            if tile.start_x >= region.end_x()
                || tile.start_y >= region.end_y()
                || tile.end_x() <= region.start_x
                || tile.end_y() <= region.start_y
            {
                continue;
            }
            let Some(stored) = self.get_tile(step, &tile)? else {
                continue;
            };
            let Some(array) = stored.as_raster() else {
                continue;
            };

            // Stored tiles may be clipped at the raster edge; use the
            // actual extent.
            let tile_end_x = tile.start_x + array.nrows();
            let tile_end_y = tile.start_y + array.ncols();
            let x0 = region.start_x.max(tile.start_x);
            let x1 = region.end_x().min(tile_end_x);
            let y0 = region.start_y.max(tile.start_y);
            let y1 = region.end_y().min(tile_end_y);
            if x0 >= x1 || y0 >= y1 {
                continue;
            }

            data.slice_mut(s![
                x0 - region.start_x..x1 - region.start_x,
                y0 - region.start_y..y1 - region.start_y
            ])
            .assign(&array.slice(s![
                x0 - tile.start_x..x1 - tile.start_x,
                y0 - tile.start_y..y1 - tile.start_y
            ]));
        }
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Memory backend
// ---------------------------------------------------------------------------

pub struct MemoryStore {
    dims: (usize, usize, usize),
    tiles: Mutex<AHashMap<(String, TileParams), TileData>>,
}

impl MemoryStore {
    pub fn new(width: usize, height: usize, tile_size: usize) -> Self {
        Self {
            dims: (width, height, tile_size),
            tiles: Mutex::new(AHashMap::new()),
        }
    }
}

impl TileStore for MemoryStore {
    fn grid_dims(&self) -> (usize, usize, usize) {
        self.dims
    }

    fn has_tile(&self, step: &StepParams, tile: &TileParams) -> bool {
        self.tiles
            .lock()
            .expect("tile map lock")
            .contains_key(&(step.name().to_string(), *tile))
    }

    fn get_tile(&self, step: &StepParams, tile: &TileParams) -> Result<Option<TileData>> {
        Ok(self
            .tiles
            .lock()
            .expect("tile map lock")
            .get(&(step.name().to_string(), *tile))
            .cloned())
    }

    fn save_tile(&self, step: &StepParams, tile: &TileParams, data: TileData) -> Result<()> {
        self.tiles
            .lock()
            .expect("tile map lock")
            .insert((step.name().to_string(), *tile), data);
        Ok(())
    }

    fn get_all_tiles(&self, step: &StepParams) -> Result<Vec<(TileParams, TileData)>> {
        Ok(self
            .tiles
            .lock()
            .expect("tile map lock")
            .iter()
            .filter(|((name, _), _)| name == step.name())
            .map(|((_, tile), data)| (*tile, data.clone()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Disk backend
// ---------------------------------------------------------------------------

pub struct DiskStore {
    dims: (usize, usize, usize),
    work_dir: PathBuf,
}

impl DiskStore {
    pub fn new(work_dir: PathBuf, width: usize, height: usize, tile_size: usize) -> Result<Self> {
        fs::create_dir_all(&work_dir).map_err(|e| Error::TileIo {
            path: work_dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dims: (width, height, tile_size),
            work_dir,
        })
    }

    fn tile_path(&self, step: &StepParams, tile: &TileParams) -> PathBuf {
        self.work_dir.join(format!(
            "{}-tile_{}-{}_{}-{}.{}",
            step.name(),
            tile.start_x,
            tile.start_y,
            tile.width,
            tile.height,
            step.file_extension()
        ))
    }

    /// Parse tile parameters back out of a stored file name.
    fn parse_tile_name(step: &StepParams, name: &str) -> Option<TileParams> {
        let prefix = format!("{}-tile_", step.name());
        let suffix = format!(".{}", step.file_extension());
        let middle = name.strip_prefix(&prefix)?.strip_suffix(&suffix)?;
        let (start, extent) = middle.split_once('_')?;
        let (sx, sy) = start.split_once('-')?;
        let (w, h) = extent.split_once('-')?;
        Some(TileParams::new(
            sx.parse().ok()?,
            sy.parse().ok()?,
            w.parse().ok()?,
            h.parse().ok()?,
        ))
    }

    fn load(&self, step: &StepParams, path: &PathBuf) -> Result<TileData> {
        match step.kind() {
            StepKind::Raster => {
                let bytes = fs::read(path).map_err(|e| Error::TileIo {
                    path: path.clone(),
                    source: e,
                })?;
                let array: Array2<i32> = bincode::deserialize(&bytes)
                    .map_err(|e| Error::Serialize(e.to_string()))?;
                Ok(TileData::Raster(array))
            }
            StepKind::Vector => Ok(TileData::Vector(io::read_feature_set(path, TILE_LABEL)?)),
        }
    }

    /// Write bytes under a temporary name, then rename into place so a
    /// partially-written tile is never visible under its final name.
    fn write_atomic(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| Error::TileIo {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| Error::TileIo {
            path: path.clone(),
            source: e,
        })
    }
}

impl TileStore for DiskStore {
    fn grid_dims(&self) -> (usize, usize, usize) {
        self.dims
    }

    fn has_tile(&self, step: &StepParams, tile: &TileParams) -> bool {
        self.tile_path(step, tile).is_file()
    }

    fn get_tile(&self, step: &StepParams, tile: &TileParams) -> Result<Option<TileData>> {
        let path = self.tile_path(step, tile);
        if !path.is_file() {
            return Ok(None);
        }
        self.load(step, &path).map(Some)
    }

    fn save_tile(&self, step: &StepParams, tile: &TileParams, data: TileData) -> Result<()> {
        let path = self.tile_path(step, tile);
        match (&data, step.kind()) {
            (TileData::Raster(array), StepKind::Raster) => {
                let bytes =
                    bincode::serialize(array).map_err(|e| Error::Serialize(e.to_string()))?;
                self.write_atomic(&path, &bytes)
            }
            (TileData::Vector(set), StepKind::Vector) => {
                let tmp = path.with_extension("tmp");
                io::write_feature_set(&tmp, set, TILE_LABEL)?;
                fs::rename(&tmp, &path).map_err(|e| Error::TileIo {
                    path: path.clone(),
                    source: e,
                })
            }
            _ => panic!("tile data kind does not match step `{}`", step.name()),
        }
    }

    fn get_all_tiles(&self, step: &StepParams) -> Result<Vec<(TileParams, TileData)>> {
        let entries = fs::read_dir(&self.work_dir).map_err(|e| Error::TileIo {
            path: self.work_dir.clone(),
            source: e,
        })?;

        let mut tiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::TileIo {
                path: self.work_dir.clone(),
                source: e,
            })?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(tile) = Self::parse_tile_name(step, name) else {
                continue;
            };
            match self.load(step, &entry.path()) {
                Ok(data) => tiles.push((tile, data)),
                Err(e) => warn!("skipping unreadable tile {name}: {e}"),
            }
        }
        Ok(tiles)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn raster_step() -> StepParams {
        StepParams::new("clean", StepKind::Raster)
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new(4, 4, 2);
        let step = raster_step();
        let tile = TileParams::new(0, 0, 2, 2);
        assert!(!store.has_tile(&step, &tile));
        assert!(store.get_tile(&step, &tile).unwrap().is_none());

        store
            .save_tile(&step, &tile, TileData::Raster(array![[1, 2], [3, 4]]))
            .unwrap();
        assert!(store.has_tile(&step, &tile));
        let data = store.get_tile(&step, &tile).unwrap().unwrap();
        assert_eq!(data.as_raster().unwrap(), &array![[1, 2], [3, 4]]);
    }

    #[test]
    fn disk_store_round_trips_and_names_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf(), 4, 4, 2).unwrap();
        let step = raster_step();
        let tile = TileParams::new(2, 0, 2, 2);

        store
            .save_tile(&step, &tile, TileData::Raster(array![[5, 6], [7, 8]]))
            .unwrap();
        assert!(dir.path().join("clean-tile_2-0_2-2.bin").is_file());
        // No stale temporary file remains under a visible name.
        assert!(!dir.path().join("clean-tile_2-0_2-2.tmp").exists());

        let data = store.get_tile(&step, &tile).unwrap().unwrap();
        assert_eq!(data.as_raster().unwrap(), &array![[5, 6], [7, 8]]);

        let all = store.get_all_tiles(&step).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, tile);
    }

    #[test]
    fn region_assembles_across_tiles() {
        let store = MemoryStore::new(4, 4, 2);
        let step = raster_step();
        store
            .save_tile(
                &step,
                &TileParams::new(0, 0, 2, 2),
                TileData::Raster(array![[1, 1], [1, 1]]),
            )
            .unwrap();
        store
            .save_tile(
                &step,
                &TileParams::new(0, 2, 2, 2),
                TileData::Raster(array![[2, 2], [2, 2]]),
            )
            .unwrap();
        store
            .save_tile(
                &step,
                &TileParams::new(2, 0, 2, 2),
                TileData::Raster(array![[3, 3], [3, 3]]),
            )
            .unwrap();
        // Tile (2, 2) is deliberately missing: absent tiles zero-fill.

        let region = store
            .get_region(&step, &TileParams::new(1, 1, 2, 2))
            .unwrap();
        assert_eq!(region, array![[1, 2], [3, 0]]);
    }

    #[test]
    fn vector_tiles_round_trip_on_disk() {
        use geo::{Coord, LineString, Polygon};

        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path().to_path_buf(), 2, 2, 2).unwrap();
        let step = StepParams::new("polygonize", StepKind::Vector);
        let tile = TileParams::new(0, 0, 2, 2);

        let polygon = Polygon::new(
            LineString::new(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 0.0, y: 0.0 },
            ]),
            vec![],
        );
        let set = crate::tiler::FeatureSet::new(vec![crate::tiler::Feature {
            polygon: polygon.clone(),
            label: 42,
        }]);
        store
            .save_tile(&step, &tile, TileData::Vector(set))
            .unwrap();

        let data = store.get_tile(&step, &tile).unwrap().unwrap();
        let read = data.as_vector().unwrap();
        assert_eq!(read.features[0].label, 42);
        assert_eq!(read.features[0].polygon, polygon);
    }
}
