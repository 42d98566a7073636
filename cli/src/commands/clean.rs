use terravec::{check_input_path, read_grid, Cleaner, CleanerParams, Result};

use crate::cli::CleanArgs;

pub fn run(args: &CleanArgs) -> Result<()> {
    check_input_path(&args.input)?;
    let grid = read_grid(&args.input)?;

    let params = CleanerParams {
        output_file: args.output.clone(),
        min_blob_size: args.min_blob_size,
        tile_size: args.tile_size,
        workers: args.workers,
        debug: args.debug,
    };

    Cleaner::new(&grid, params)?.clean()
}
