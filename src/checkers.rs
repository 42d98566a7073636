//! Input checkers. Everything here raises `Error::Config` before any
//! tile is scheduled.

use std::path::Path;

use crate::error::{Error, Result};

pub fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if value < 0.0 {
        return Err(Error::Config(format!("value for `{name}` must be non-negative")));
    }
    Ok(())
}

pub fn check_positive(name: &str, value: f64) -> Result<()> {
    if value <= 0.0 {
        return Err(Error::Config(format!("value for `{name}` must be positive")));
    }
    Ok(())
}

/// The input file must exist.
pub fn check_input_path(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::Config(format!(
            "input file does not exist: {}",
            path.display()
        )));
    }
    Ok(())
}

/// The output file's directory must exist.
pub fn check_output_path(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()),
    };
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "output directory does not exist: {}",
            dir.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_zero_where_required() {
        assert!(check_non_negative("--pixel-size", 0.0).is_ok());
        assert!(check_non_negative("--pixel-size", -1.0).is_err());
        assert!(check_positive("--tile-size", 1.0).is_ok());
        assert!(check_positive("--tile-size", 0.0).is_err());
    }

    #[test]
    fn output_path_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_output_path(&dir.path().join("out.geojson")).is_ok());
        assert!(check_output_path(&dir.path().join("missing/out.geojson")).is_err());
        assert!(check_output_path(Path::new("out.geojson")).is_ok());
    }
}
