//! Decomposition of self-intersecting polygons into valid ones.
//!
//! The exterior ring is resolved into simple faces; each interior ring
//! likewise. Interior faces are assigned to the exterior face that
//! contains them and either subtracted (when their border meaningfully
//! intersects the exterior's) or kept as holes. The union of the
//! emitted polygons equals the original.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashSet;
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, BoundingRect, Contains, Intersects, LineString, MultiPolygon, Polygon};
use geo::Validation;
use log::warn;

use crate::error::{Error, Result};
use crate::geometry::QCoord;
use crate::io;
use crate::tiler::{Feature, FeatureSet};

static DUMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Decompose a possibly self-intersecting polygon into valid polygons
/// whose union covers the same region. Invalid output is dumped as
/// GeoJSON under `dump_dir` before erroring.
pub fn fix_polygon(polygon: &Polygon<f64>, dump_dir: Option<&Path>) -> Result<Vec<Polygon<f64>>> {
    let exterior_faces = ring_faces(polygon.exterior());

    let mut interior_faces: Vec<Polygon<f64>> = Vec::new();
    for ring in polygon.interiors() {
        interior_faces.extend(ring_faces(ring));
    }
    let interior_faces = merge_faces(interior_faces);

    // Assign each interior face to the exterior face containing it.
    let mut assigned: Vec<Vec<Polygon<f64>>> = vec![Vec::new(); exterior_faces.len()];
    for interior in interior_faces {
        if let Some(e) = exterior_faces
            .iter()
            .position(|exterior| exterior.contains(&interior))
        {
            assigned[e].push(interior);
        }
    }

    let mut fixed = Vec::new();
    for (exterior, interiors) in exterior_faces.into_iter().zip(assigned) {
        let mut shell = MultiPolygon::new(vec![exterior]);
        let mut holes: Vec<Polygon<f64>> = Vec::new();
        for interior in interiors {
            let meaningful = shell
                .0
                .iter()
                .any(|piece| meaningful_intersection(piece, &interior));
            if meaningful {
                shell = shell.difference(&interior);
            } else {
                holes.push(interior);
            }
        }

        for piece in shell.0 {
            let hole_rings: Vec<LineString<f64>> = holes
                .iter()
                .filter(|hole| piece.contains(*hole))
                .map(|hole| hole.exterior().clone())
                .collect();
            let candidate = Polygon::new(piece.exterior().clone(), hole_rings);
            if !candidate.is_valid() {
                dump_invalid(polygon, &candidate, dump_dir);
                return Err(Error::Geometry(
                    "polygon is not valid after fixing".to_string(),
                ));
            }
            fixed.push(candidate);
        }
    }
    Ok(fixed)
}

/// Resolve one (possibly self-intersecting) ring into simple faces.
/// Union against an empty geometry re-nodes the ring and extracts the
/// simple faces of the regions it encloses; any holes those faces carry
/// are dropped, since only the shells matter here.
fn ring_faces(ring: &LineString<f64>) -> Vec<Polygon<f64>> {
    if ring.0.len() < 4 {
        return Vec::new();
    }
    let polygon = Polygon::new(ring.clone(), Vec::new());
    polygon
        .union(&MultiPolygon::new(Vec::new()))
        .0
        .into_iter()
        .map(|face| Polygon::new(face.exterior().clone(), Vec::new()))
        .collect()
}

/// Union faces so that overlapping or nested shells merge into one.
fn merge_faces(faces: Vec<Polygon<f64>>) -> Vec<Polygon<f64>> {
    faces
        .into_iter()
        .map(|face| MultiPolygon::new(vec![face]))
        .reduce(|a, b| a.union(&b))
        .map(|merged| {
            merged
                .0
                .into_iter()
                .map(|face| Polygon::new(face.exterior().clone(), Vec::new()))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the borders of two polygons intersect in more than a single
/// point: any collinear overlap, or at least two distinct crossings.
fn meaningful_intersection(p1: &Polygon<f64>, p2: &Polygon<f64>) -> bool {
    let Some(bbox2) = p2.bounding_rect() else {
        return false;
    };
    let mut points: AHashSet<QCoord> = AHashSet::new();
    for edge1 in p1.exterior().lines() {
        if !edge1.intersects(&bbox2) {
            continue;
        }
        for edge2 in p2.exterior().lines() {
            match line_intersection(edge1, edge2) {
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    points.insert(QCoord::new(intersection));
                    if points.len() >= 2 {
                        return true;
                    }
                }
                None => {}
            }
        }
    }
    false
}

fn dump_invalid(original: &Polygon<f64>, fixed: &Polygon<f64>, dump_dir: Option<&Path>) {
    let Some(dir) = dump_dir else {
        return;
    };
    let id = DUMP_COUNTER.fetch_add(1, Ordering::SeqCst);
    for (name, polygon) in [("orig", original), ("fixed", fixed)] {
        let path = dir.join(format!("{name}_polygon_{id}.geojson"));
        let set = FeatureSet::new(vec![Feature {
            polygon: polygon.clone(),
            label: 0,
        }]);
        match io::write_feature_set(&path, &set, "label") {
            Ok(()) => warn!("{name} polygon saved to {}", path.display()),
            Err(e) => warn!("could not dump {name} polygon: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::{Area, Coord, LineString, Polygon};

    use super::fix_polygon;

    fn ls(pts: &[(f64, f64)]) -> LineString<f64> {
        LineString::new(pts.iter().map(|&(x, y)| Coord { x, y }).collect())
    }

    #[test]
    fn valid_polygon_passes_through() {
        let polygon = Polygon::new(
            ls(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![],
        );
        let fixed = fix_polygon(&polygon, None).unwrap();
        assert_eq!(fixed.len(), 1);
        assert!((fixed[0].unsigned_area() - 16.0).abs() < 1.0e-9);
    }

    #[test]
    fn bowtie_splits_into_two_faces() {
        // Figure-eight exterior crossing itself at (1, 1).
        let polygon = Polygon::new(
            ls(&[
                (0.0, 0.0),
                (2.0, 2.0),
                (2.0, 0.0),
                (0.0, 2.0),
                (0.0, 0.0),
            ]),
            vec![],
        );
        let fixed = fix_polygon(&polygon, None).unwrap();
        assert_eq!(fixed.len(), 2);
        let total: f64 = fixed.iter().map(|p| p.unsigned_area()).sum();
        assert!((total - 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn contained_hole_is_kept() {
        let polygon = Polygon::new(
            ls(&[(0.0, 0.0), (6.0, 0.0), (6.0, 6.0), (0.0, 6.0), (0.0, 0.0)]),
            vec![ls(&[
                (2.0, 2.0),
                (2.0, 4.0),
                (4.0, 4.0),
                (4.0, 2.0),
                (2.0, 2.0),
            ])],
        );
        let fixed = fix_polygon(&polygon, None).unwrap();
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].interiors().len(), 1);
        assert!((fixed[0].unsigned_area() - 32.0).abs() < 1.0e-9);
    }

    #[test]
    fn hole_touching_the_border_is_subtracted() {
        // The hole's right edge lies on the shell's right edge, so its
        // border meaningfully intersects the exterior and it is carved
        // out of the shell instead of kept as a hole.
        let polygon = Polygon::new(
            ls(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![ls(&[
                (2.0, 1.0),
                (2.0, 3.0),
                (4.0, 3.0),
                (4.0, 1.0),
                (2.0, 1.0),
            ])],
        );
        let fixed = fix_polygon(&polygon, None).unwrap();
        assert!(!fixed.is_empty());
        let total: f64 = fixed.iter().map(|p| p.unsigned_area()).sum();
        assert!((total - 12.0).abs() < 1.0e-9);
        assert!(fixed.iter().all(|p| p.interiors().is_empty()));
    }
}
