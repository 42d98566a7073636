use std::path::PathBuf;

/// Raster vectorization CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "terravec", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Convert a categorical raster grid into smoothed polygons
    Vectorize(VectorizeArgs),

    /// Remove small blobs from a raster grid
    Clean(CleanArgs),
}

#[derive(clap::Args, Debug)]
pub struct VectorizeArgs {
    /// Input raster grid file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output GeoJSON file, defaults to "./out.geojson"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// The minimum number of pixels a blob can have and not be
    /// filtered out
    #[arg(long, default_value_t = 5)]
    pub min_blob_size: usize,

    /// World size of a pixel; 0 infers it from the raster
    #[arg(long, default_value_t = 0.0)]
    pub pixel_size: f64,

    /// The amount of simplification applied relative to the pixel size
    #[arg(long, default_value_t = 1.0)]
    pub simplification_pixel_window: f64,

    /// The number of iterations of smoothing to run on the output
    /// polygons
    #[arg(long, default_value_t = 0)]
    pub smoothing_iterations: usize,

    /// Tile size in pixels; 0 picks automatically
    #[arg(long, default_value_t = 0)]
    pub tile_size: usize,

    /// Number of workers to process tiles in parallel; 0 uses all
    /// available CPUs
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// The name of the label attribute in the output
    #[arg(long, default_value = "label")]
    pub label_name: String,

    /// The directory to create tiles in; existing tiles are not
    /// recreated, so a re-run resumes
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub tile_dir: Option<PathBuf>,

    /// Force the disk store and keep the working directory
    #[arg(long)]
    pub debug: bool,
}

#[derive(clap::Args, Debug)]
pub struct CleanArgs {
    /// Input raster grid file
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output raster grid file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// The minimum number of pixels a blob can have and not be
    /// filtered out
    #[arg(long, default_value_t = 30)]
    pub min_blob_size: usize,

    /// Tile size in pixels; 0 picks automatically
    #[arg(long, default_value_t = 0)]
    pub tile_size: usize,

    /// Number of workers to process tiles in parallel; 0 uses all
    /// available CPUs
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Force the disk store and keep the working directory
    #[arg(long)]
    pub debug: bool,
}
