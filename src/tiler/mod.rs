//! Multi-stage, per-tile execution: a fixed tile grid is streamed
//! through an ordered list of steps, with intermediate artifacts cached
//! in a tile store so later stages can fetch tile-local and
//! buffered-region views of prior stage output.

mod cancel;
mod config;
mod pipeline;
mod store;
mod types;

pub use cancel::Coordinator;
pub use config::{auto_tile_size, tile_grid, ExecMode, PipelineParams, RunConfig, StoreKind};
pub use pipeline::{Pipeline, StepFn, StepHelper, UnionFn};
pub use store::{DiskStore, MemoryStore, TileStore};
pub use types::{Feature, FeatureSet, StepKind, StepParams, TileData, TileParams};
