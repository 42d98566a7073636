mod geojson;
mod gridfile;

pub use geojson::{read_feature_set, write_feature_set, write_label_features};
pub use gridfile::{read_grid, write_grid};
