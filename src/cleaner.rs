//! Standalone raster cleaning: the blobifier applied tile by tile over
//! buffered windows, reassembled into a full output grid.
//!
//! Unlike the vectorizer's clean stage, each tile reads its buffered
//! window straight from the raster source, so tiles are fully
//! independent and can run end-to-end in parallel workers.

use std::path::PathBuf;

use log::info;
use ndarray::{s, Array2};

use crate::blobifier::Blobifier;
use crate::checkers::{check_output_path, check_positive};
use crate::error::Result;
use crate::io;
use crate::raster::{RasterGrid, RasterSource, NODATA};
use crate::tiler::{
    Pipeline, PipelineParams, StepFn, StepHelper, StepKind, StepParams, TileData, TileParams,
};

/// User-inputtable parameters of a cleaning run.
#[derive(Clone, Debug)]
pub struct CleanerParams {
    /// Output grid file path.
    pub output_file: PathBuf,
    /// Minimum pixels a blob keeps; smaller blobs are filled from
    /// their neighbors.
    pub min_blob_size: usize,
    /// Tile edge in pixels; 0 picks automatically.
    pub tile_size: usize,
    /// Worker count; 0 uses every CPU.
    pub workers: usize,
    /// Force the disk store and keep the working directory.
    pub debug: bool,
}

impl Default for CleanerParams {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("cleaned.grid"),
            min_blob_size: 5,
            tile_size: 0,
            workers: 1,
            debug: false,
        }
    }
}

/// Preprocesses a raster by removing small blobs, without vectorizing.
pub struct Cleaner<'a> {
    source: &'a dyn RasterSource,
    params: CleanerParams,
}

impl<'a> Cleaner<'a> {
    pub fn new(source: &'a dyn RasterSource, params: CleanerParams) -> Result<Self> {
        check_output_path(&params.output_file)?;
        check_positive("raster width", source.width() as f64)?;
        check_positive("raster height", source.height() as f64)?;
        Ok(Self { source, params })
    }

    /// Clean every tile and write the reassembled grid.
    pub fn clean(&self) -> Result<()> {
        let steps: Vec<(StepParams, StepFn<'_>)> = vec![(
            StepParams::new("clean", StepKind::Raster),
            Box::new(|tile: &TileParams, helper: &StepHelper| self.clean_tile(tile, helper)),
        )];

        let pipeline = Pipeline::new(
            steps,
            Box::new(|helper: &StepHelper| self.union(helper)),
            PipelineParams {
                width: self.source.width(),
                height: self.source.height(),
                tile_size: self.params.tile_size,
                workers: self.params.workers,
                work_dir: None,
                debug: self.params.debug,
                // Each tile reads its buffered window from the source
                // directly, so tiles are independent.
                uses_regions: false,
            },
        );
        pipeline.run()
    }

    fn clean_tile(&self, tile: &TileParams, helper: &StepHelper) -> Result<()> {
        let buffer = self.params.min_blob_size.saturating_sub(1);
        let bx0 = tile.start_x.saturating_sub(buffer);
        let by0 = tile.start_y.saturating_sub(buffer);
        let bx1 = (tile.end_x() + buffer).min(self.source.width());
        let by1 = (tile.end_y() + buffer).min(self.source.height());
        if bx0 >= bx1 || by0 >= by1 {
            return Ok(());
        }
        let region = TileParams::new(bx0, by0, bx1 - bx0, by1 - by0);

        let buffered = self.source.read_window(&region)?;
        let cleaned = Blobifier::new(&buffered, self.params.min_blob_size).blobify()?;

        let rel_x0 = tile.start_x - region.start_x;
        let rel_y0 = tile.start_y - region.start_y;
        let rel_x1 = (rel_x0 + tile.width).min(cleaned.nrows());
        let rel_y1 = (rel_y0 + tile.height).min(cleaned.ncols());
        let data = cleaned.slice(s![rel_x0..rel_x1, rel_y0..rel_y1]).to_owned();
        helper.save_curr_tile(tile, TileData::Raster(data))
    }

    /// Reassemble all cleaned tiles into one grid and write it with the
    /// source's transform.
    fn union(&self, helper: &StepHelper) -> Result<()> {
        let (width, height) = (self.source.width(), self.source.height());
        let mut data = Array2::from_elem((width, height), NODATA);

        for (tile, stored) in helper.get_prev_tiles()? {
            let Some(array) = stored.as_raster() else {
                continue;
            };
            let x1 = (tile.start_x + array.nrows()).min(width);
            let y1 = (tile.start_y + array.ncols()).min(height);
            data.slice_mut(s![tile.start_x..x1, tile.start_y..y1])
                .assign(&array.slice(s![..x1 - tile.start_x, ..y1 - tile.start_y]));
        }

        let grid = RasterGrid::new(data, self.source.transform());
        io::write_grid(&self.params.output_file, &grid)?;
        info!("wrote cleaned grid to {}", self.params.output_file.display());
        Ok(())
    }
}
