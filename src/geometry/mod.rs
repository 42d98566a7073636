mod chains;
mod quant;
mod rings;
mod simplify;
mod smooth;

pub use chains::{assemble_chains, Chain};
pub use quant::{QCoord, QEdge};
pub use rings::{
    close_ring, coords_eq, lines_equal, lines_equal_reversed, remove_collinear, rings_equal_cyclic,
};
pub use simplify::simplify_segment;
pub use smooth::smooth_segment;

/// Tolerance for coordinate comparisons, cutpoint deduplication, and
/// orientation checks. User coordinates are never compared exactly.
pub const EPSILON: f64 = 1.0e-10;
