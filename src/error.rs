//! Error taxonomy for the vectorization pipeline.
//!
//! Configuration and input errors are raised before any tile is
//! scheduled. Per-tile faults are recorded and isolated; only the final
//! union step's failure is fatal to a run.

use std::path::PathBuf;

use thiserror::Error;

use crate::tiler::TileParams;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing user inputs.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The input raster cannot be opened or decoded.
    #[error("cannot read input raster: {0}")]
    Input(String),

    /// A polygon could not be repaired into valid geometry.
    #[error("geometry cannot be repaired: {0}")]
    Geometry(String),

    /// The union of polygons produced a non-polygon or disagreed with
    /// the pinned border. Non-fatal unless the pin is enforced.
    #[error("topology check failed: {0}")]
    Topology(String),

    /// Working-directory read or write failure.
    #[error("tile I/O failed at {}: {source}", path.display())]
    TileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error escaped a step function for one tile.
    #[error("step `{step}` failed on tile {tile}: {message}")]
    WorkerFault {
        step: String,
        tile: TileParams,
        message: String,
    },

    /// Cooperative shutdown after SIGINT/SIGTERM.
    #[error("clean exit")]
    Cancelled,

    /// Every pixel of the grid is the invalid sentinel, so the majority
    /// fill has nothing to propagate from.
    #[error("grid contains no valid pixels")]
    AllInvalid,

    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl Error {
    /// Exit code the CLI maps this error to.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::Input(_) => 2,
            _ => 1,
        }
    }
}
