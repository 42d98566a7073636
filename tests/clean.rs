// The standalone cleaner, run tiled, must agree with cleaning the
// whole grid at once: the buffered windows make every component that
// could influence a tile fully visible to it.

use ndarray::Array2;

use terravec::{read_grid, AffineTransform, Blobifier, Cleaner, CleanerParams, RasterGrid};

fn speckled_grid() -> Array2<i32> {
    // A 12x12 field of 7 with structures deliberately crossing the
    // 4-pixel tile seams: a small blob straddling a seam, a lone pixel,
    // and a large region that must survive.
    let mut data = Array2::from_elem((12, 12), 7);
    data[(3, 3)] = 2;
    data[(3, 4)] = 2;
    data[(4, 3)] = 2;
    data[(7, 7)] = 5;
    for r in 8..12 {
        for c in 0..4 {
            data[(r, c)] = 9;
        }
    }
    data
}

fn clean_tiled(data: &Array2<i32>, min_blob_size: usize, workers: usize) -> Array2<i32> {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("cleaned.grid");
    let grid = RasterGrid::new(data.clone(), AffineTransform::identity());

    let params = CleanerParams {
        output_file: output.clone(),
        min_blob_size,
        tile_size: 4,
        workers,
        ..Default::default()
    };
    Cleaner::new(&grid, params).unwrap().clean().unwrap();
    read_grid(&output).unwrap().into_data()
}

#[test]
fn tiled_cleaning_matches_whole_grid_cleaning() {
    let data = speckled_grid();
    let expected = Blobifier::new(&data, 4).blobify().unwrap();
    let tiled = clean_tiled(&data, 4, 1);
    assert_eq!(tiled, expected);
}

#[test]
fn parallel_workers_produce_the_same_result() {
    let data = speckled_grid();
    let expected = Blobifier::new(&data, 4).blobify().unwrap();
    // More than one worker with no region reads runs tiles
    // independently.
    let tiled = clean_tiled(&data, 4, 2);
    assert_eq!(tiled, expected);
}

#[test]
fn cleaning_keeps_large_regions_and_fills_small_ones() {
    let data = speckled_grid();
    let cleaned = clean_tiled(&data, 4, 1);

    // The 4x4 region of 9s survives untouched.
    assert_eq!(cleaned[(9, 1)], 9);
    // The lone 5 and the three-pixel blob of 2s are gone.
    assert!(cleaned.iter().all(|&v| v != 5 && v != 2));
}
