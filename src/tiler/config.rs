//! Run-configuration selection: execution mode, store backend, worker
//! count, and the working/log directories.

use std::path::PathBuf;

use log::info;

use crate::error::{Error, Result};

/// Above this many (pixel, step) units the intermediate data is assumed
/// not to fit in memory and the disk store is used.
const MAX_UNITS: f64 = 1.0e8;

/// Tile-size clamp for the automatic choice.
const MIN_TILE_SIZE: usize = 10;
const MAX_TILE_SIZE: usize = 1000;

/// User-facing pipeline parameters, already validated.
#[derive(Clone, Debug)]
pub struct PipelineParams {
    /// Raster extent along tile axis x (grid rows).
    pub width: usize,
    /// Raster extent along tile axis y (grid columns).
    pub height: usize,
    /// Tile edge in pixels; 0 picks automatically.
    pub tile_size: usize,
    /// Worker count; 0 uses every CPU.
    pub workers: usize,
    /// Working directory for the disk store; `None` creates an
    /// ephemeral temporary directory.
    pub work_dir: Option<PathBuf>,
    /// Force the disk store and keep the working directory afterwards.
    pub debug: bool,
    /// Whether any step reads buffered regions of the previous step.
    pub uses_regions: bool,
}

/// Which backend holds intermediate tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Disk,
}

/// How (step, tile) units are scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    /// Every tile runs all steps end-to-end in its own worker over a
    /// private in-memory store. Region reads are forbidden.
    Independent,
    /// All tiles finish a step before the next step starts.
    StepWise { parallel: bool },
}

/// The resolved configuration of one run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub mode: ExecMode,
    pub store: StoreKind,
    pub workers: usize,
    pub tile_size: usize,
    /// Working directory (disk store only).
    pub work_dir: PathBuf,
    /// Remove the working directory after a successful run.
    pub cleanup: bool,
    /// Per-worker fault logs live here.
    pub log_dir: PathBuf,
}

impl RunConfig {
    /// Pick mode, store, and directories for the given parameters.
    pub fn choose(params: &PipelineParams, num_steps: usize) -> Result<Self> {
        let workers = if params.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            params.workers
        };

        let tile_size = if params.tile_size > 0 {
            params.tile_size
        } else {
            auto_tile_size(params.width, params.height, workers)
        };

        let num_units = (params.width as f64) * (params.height as f64) * (num_steps as f64);
        let large = num_units > MAX_UNITS;

        let (mode, store) = if params.debug || large {
            (ExecMode::StepWise { parallel: workers > 1 }, StoreKind::Disk)
        } else if params.uses_regions || workers == 1 {
            // The memory store cannot be shared across parallel
            // workers, and region reads need a fully materialized
            // previous step.
            (ExecMode::StepWise { parallel: false }, StoreKind::Memory)
        } else {
            (ExecMode::Independent, StoreKind::Memory)
        };

        let (work_dir, ephemeral) = match &params.work_dir {
            Some(dir) => (dir.clone(), false),
            None => (
                tempfile::tempdir()
                    .map_err(|e| Error::Config(format!("cannot create working directory: {e}")))?
                    .into_path(),
                true,
            ),
        };
        let log_dir = tempfile::tempdir()
            .map_err(|e| Error::Config(format!("cannot create log directory: {e}")))?
            .into_path();

        // A user-provided directory is never removed; neither is
        // anything in debug mode.
        let cleanup = ephemeral && !params.debug;

        match (mode, store) {
            (ExecMode::StepWise { parallel: true }, StoreKind::Disk) => {
                info!("using parallel disk-backed configuration ({workers} workers)")
            }
            (ExecMode::StepWise { .. }, _) => info!("using sequential in-memory configuration"),
            (ExecMode::Independent, _) => {
                info!("using independent per-tile configuration ({workers} workers)")
            }
        }
        if store == StoreKind::Disk {
            info!("working directory: {}", work_dir.display());
        }
        info!("logs directory: {}", log_dir.display());

        Ok(Self {
            mode,
            store,
            workers,
            tile_size,
            work_dir,
            cleanup,
            log_dir,
        })
    }
}

/// Automatic tile size: one tile per worker on average, clamped.
pub fn auto_tile_size(width: usize, height: usize, workers: usize) -> usize {
    let per_worker = (width as f64) * (height as f64) / (workers.max(1) as f64);
    (per_worker.sqrt().round() as usize).clamp(MIN_TILE_SIZE, MAX_TILE_SIZE)
}

/// Enumerate the fixed tile grid covering the raster.
pub fn tile_grid(width: usize, height: usize, tile_size: usize) -> Vec<super::TileParams> {
    let mut tiles = Vec::new();
    let mut x = 0;
    while x < width {
        let mut y = 0;
        while y < height {
            tiles.push(super::TileParams::new(x, y, tile_size, tile_size));
            y += tile_size;
        }
        x += tile_size;
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_tile_size_is_clamped() {
        assert_eq!(auto_tile_size(4, 4, 1), MIN_TILE_SIZE);
        assert_eq!(auto_tile_size(100_000, 100_000, 4), MAX_TILE_SIZE);
        assert_eq!(auto_tile_size(200, 200, 4), 100);
    }

    #[test]
    fn tile_grid_covers_the_raster() {
        let tiles = tile_grid(25, 10, 10);
        assert_eq!(tiles.len(), 3);
        assert!(tiles.iter().any(|t| t.start_x == 20 && t.start_y == 0));
        // Nominal extent is kept even when it overhangs the edge.
        assert!(tiles.iter().all(|t| t.width == 10 && t.height == 10));
    }
}
