use std::path::PathBuf;

use terravec::{check_input_path, read_grid, Result, Vectorizer, VectorizerParams};

use crate::cli::VectorizeArgs;

pub fn run(args: &VectorizeArgs) -> Result<()> {
    check_input_path(&args.input)?;
    let grid = read_grid(&args.input)?;

    let params = VectorizerParams {
        output_file: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from("out.geojson")),
        label_name: args.label_name.clone(),
        min_blob_size: args.min_blob_size,
        pixel_size: args.pixel_size,
        simplification_pixel_window: args.simplification_pixel_window,
        smoothing_iterations: args.smoothing_iterations,
        tile_size: args.tile_size,
        workers: args.workers,
        tile_dir: args.tile_dir.clone(),
        debug: args.debug,
    };

    Vectorizer::new(&grid, params)?.vectorize()
}
