//! The end-to-end driver: validates user parameters, wires the five
//! pipeline stages (input, clean, polygonize, vectorize, union), and
//! writes the final dissolved output.

use std::path::PathBuf;

use geo::{LineString, Polygon};
use log::info;
use ndarray::s;
use geo::Validation;

use crate::blobifier::Blobifier;
use crate::checkers::{check_non_negative, check_output_path, check_positive};
use crate::error::{Error, Result};
use crate::geometry::{simplify_segment, smooth_segment, EPSILON};
use crate::polygonize::polygonize_tile;
use crate::raster::RasterSource;
use crate::segmenter::{fix_polygon, Segmenter};
use crate::tiler::{
    Feature, FeatureSet, Pipeline, PipelineParams, StepFn, StepHelper, StepKind, StepParams,
    TileData, TileParams,
};
use crate::{io, stitch};

/// User-inputtable parameters of a vectorization run.
#[derive(Clone, Debug)]
pub struct VectorizerParams {
    /// Output GeoJSON file path.
    pub output_file: PathBuf,
    /// Name of the label attribute in the output.
    pub label_name: String,
    /// Minimum pixels a blob keeps; smaller blobs are filled from
    /// their neighbors. 0 or 1 disables cleaning.
    pub min_blob_size: usize,
    /// World size of a pixel; 0 infers it from the raster transform.
    pub pixel_size: f64,
    /// Douglas-Peucker tolerance, in pixels.
    pub simplification_pixel_window: f64,
    /// Chaikin refinement count.
    pub smoothing_iterations: usize,
    /// Tile edge in pixels; 0 picks automatically.
    pub tile_size: usize,
    /// Worker count; 0 uses every CPU.
    pub workers: usize,
    /// Working directory for intermediate tiles. Already-present tiles
    /// are not recreated, so re-running resumes. Defaults to an
    /// ephemeral temporary directory.
    pub tile_dir: Option<PathBuf>,
    /// Force the disk store and keep the working directory.
    pub debug: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("out.geojson"),
            label_name: "label".to_string(),
            min_blob_size: 5,
            pixel_size: 0.0,
            simplification_pixel_window: 1.0,
            smoothing_iterations: 0,
            tile_size: 0,
            workers: 1,
            tile_dir: None,
            debug: false,
        }
    }
}

/// Converts a categorical raster into simplified, smoothed polygons.
pub struct Vectorizer<'a> {
    source: &'a dyn RasterSource,
    params: VectorizerParams,
    pixel_size: f64,
}

impl<'a> Vectorizer<'a> {
    /// Validate parameters and resolve the pixel size.
    pub fn new(source: &'a dyn RasterSource, params: VectorizerParams) -> Result<Self> {
        check_output_path(&params.output_file)?;
        check_positive("raster width", source.width() as f64)?;
        check_positive("raster height", source.height() as f64)?;
        check_non_negative("--pixel-size", params.pixel_size)?;
        check_non_negative(
            "--simplification-pixel-window",
            params.simplification_pixel_window,
        )?;
        if params.label_name.is_empty() {
            return Err(Error::Config("label name must not be empty".to_string()));
        }

        let pixel_size = if params.pixel_size > 0.0 {
            params.pixel_size
        } else {
            let transform = source.transform();
            if !transform.is_square() {
                return Err(Error::Config(
                    "raster pixels are not square; pass an explicit pixel size".to_string(),
                ));
            }
            let inferred = transform.pixel_width();
            if inferred < EPSILON {
                return Err(Error::Config(
                    "cannot infer pixel size from the raster; pass it explicitly".to_string(),
                ));
            }
            inferred
        };

        Ok(Self {
            source,
            params,
            pixel_size,
        })
    }

    /// Run the full pipeline and write the output file.
    pub fn vectorize(&self) -> Result<()> {
        let steps: Vec<(StepParams, StepFn<'_>)> = vec![
            (
                StepParams::new("input", StepKind::Raster),
                Box::new(|tile: &TileParams, helper: &StepHelper| self.input_tile(tile, helper)),
            ),
            (
                StepParams::new("clean", StepKind::Raster),
                Box::new(|tile: &TileParams, helper: &StepHelper| self.clean_tile(tile, helper)),
            ),
            (
                StepParams::new("polygonize", StepKind::Vector),
                Box::new(|tile: &TileParams, helper: &StepHelper| {
                    self.polygonize_tile(tile, helper)
                }),
            ),
            (
                StepParams::new("vectorize", StepKind::Vector),
                Box::new(|tile: &TileParams, helper: &StepHelper| {
                    self.vectorize_tile(tile, helper)
                }),
            ),
        ];

        let pipeline = Pipeline::new(
            steps,
            Box::new(|helper: &StepHelper| self.stitch(helper)),
            PipelineParams {
                width: self.source.width(),
                height: self.source.height(),
                tile_size: self.params.tile_size,
                workers: self.params.workers,
                work_dir: self.params.tile_dir.clone(),
                debug: self.params.debug,
                uses_regions: true, // the clean step reads buffered regions
            },
        );
        pipeline.run()
    }

    /// Step 1: read the tile window from the raster source.
    fn input_tile(&self, tile: &TileParams, helper: &StepHelper) -> Result<()> {
        let data = self.source.read_window(tile)?;
        helper.save_curr_tile(tile, TileData::Raster(data))
    }

    /// Step 2: blobify a region buffered by `min_blob_size - 1` on each
    /// side, then crop the tile back out. The buffer guarantees every
    /// component that could influence this tile is fully visible.
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

        let buffered = helper.get_prev_region(&region)?;
        let cleaned = Blobifier::new(&buffered, self.params.min_blob_size).blobify()?;

        let rel_x0 = tile.start_x - region.start_x;
        let rel_y0 = tile.start_y - region.start_y;
        let rel_x1 = (rel_x0 + tile.width).min(cleaned.nrows());
        let rel_y1 = (rel_y0 + tile.height).min(cleaned.ncols());
        let data = cleaned.slice(s![rel_x0..rel_x1, rel_y0..rel_y1]).to_owned();
        helper.save_curr_tile(tile, TileData::Raster(data))
    }

    /// Step 3: trace the cleaned tile into world-space polygons.
    fn polygonize_tile(&self, tile: &TileParams, helper: &StepHelper) -> Result<()> {
        let Some(prev) = helper.get_prev_tile(tile)? else {
            return Ok(());
        };
        let Some(data) = prev.as_raster() else {
            return Ok(());
        };
        let set = polygonize_tile(data, tile, &self.source.transform());
        helper.save_curr_tile(tile, TileData::Vector(set))
    }

    /// Step 4: segment the tile's polygons, simplify and smooth per
    /// reference segment with the border pinned, rebuild, and repair
    /// anything invalid.
    fn vectorize_tile(&self, tile: &TileParams, helper: &StepHelper) -> Result<()> {
        let Some(prev) = helper.get_prev_tile(tile)? else {
            return Ok(());
        };
        let Some(set) = prev.as_vector() else {
            return Ok(());
        };
        if set.is_empty() {
            return helper.save_curr_tile(tile, TileData::Vector(FeatureSet::default()));
        }

        let (polygons, labels): (Vec<Polygon<f64>>, Vec<i32>) = set
            .features
            .iter()
            .map(|f| (f.polygon.clone(), f.label))
            .unzip();

        let mut segmenter = Segmenter::build(polygons, labels, true)?;
        let tolerance = self.pixel_size * self.params.simplification_pixel_window;
        if tolerance > 0.0 {
            segmenter.run_per_segment(|line: &LineString<f64>| simplify_segment(line, tolerance));
        }
        if self.params.smoothing_iterations > 0 {
            let iterations = self.params.smoothing_iterations;
            segmenter.run_per_segment(|line: &LineString<f64>| smooth_segment(line, iterations));
        }
        let (modified, labels) = segmenter.into_result()?;

        let dump_dir = std::env::temp_dir();
        let mut features = Vec::with_capacity(modified.len());
        for (polygon, label) in modified.into_iter().zip(labels) {
            if polygon.is_valid() {
                features.push(Feature { polygon, label });
            } else {
                for fixed in fix_polygon(&polygon, Some(&dump_dir))? {
                    features.push(Feature {
                        polygon: fixed,
                        label,
                    });
                }
            }
        }
        helper.save_curr_tile(tile, TileData::Vector(FeatureSet::new(features)))
    }

    /// Union: collect every final tile, dissolve by label, write the
    /// output file.
    fn stitch(&self, helper: &StepHelper) -> Result<()> {
        let tiles = helper.get_prev_tiles()?;
        info!("stitching {} tiles", tiles.len());

        let features = tiles
            .into_iter()
            .filter_map(|(_, data)| data.into_vector())
            .flat_map(|set| set.features);
        let dissolved = stitch::dissolve_by_label(features);

        io::write_label_features(&self.params.output_file, &dissolved, &self.params.label_name)?;
        info!(
            "wrote {} features to {}",
            dissolved.len(),
            self.params.output_file.display()
        );
        Ok(())
    }
}
