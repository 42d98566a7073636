//! Stitching of per-tile polygon collections into the final output:
//! concatenate everything and dissolve by label.

use std::collections::BTreeMap;

use geo::{BooleanOps, MultiPolygon, Polygon};
use log::info;

use crate::tiler::Feature;

/// Group features by label and union each group. One entry per
/// distinct label, in ascending label order.
pub fn dissolve_by_label(
    features: impl IntoIterator<Item = Feature>,
) -> Vec<(i32, MultiPolygon<f64>)> {
    let mut groups: BTreeMap<i32, Vec<Polygon<f64>>> = BTreeMap::new();
    for feature in features {
        groups.entry(feature.label).or_default().push(feature.polygon);
    }
    info!("dissolving {} labels", groups.len());

    groups
        .into_iter()
        .map(|(label, polygons)| {
            let union = polygons
                .into_iter()
                .map(|p| MultiPolygon::new(vec![p]))
                .reduce(|a, b| a.union(&b))
                .unwrap_or_else(|| MultiPolygon::new(Vec::new()));
            (label, union)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::{Area, Coord, LineString, Polygon};

    use super::dissolve_by_label;
    use crate::tiler::Feature;

    fn square(x0: f64, y0: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: x0, y: y0 },
                Coord { x: x0 + 1.0, y: y0 },
                Coord { x: x0 + 1.0, y: y0 + 1.0 },
                Coord { x: x0, y: y0 + 1.0 },
                Coord { x: x0, y: y0 },
            ]),
            vec![],
        )
    }

    #[test]
    fn touching_polygons_of_one_label_merge() {
        let features = vec![
            Feature { polygon: square(0.0, 0.0), label: 7 },
            Feature { polygon: square(1.0, 0.0), label: 7 },
        ];
        let dissolved = dissolve_by_label(features);
        assert_eq!(dissolved.len(), 1);
        let (label, union) = &dissolved[0];
        assert_eq!(*label, 7);
        assert_eq!(union.0.len(), 1);
        assert!((union.unsigned_area() - 2.0).abs() < 1.0e-9);
    }

    #[test]
    fn labels_are_dissolved_separately_and_ordered() {
        let features = vec![
            Feature { polygon: square(0.0, 0.0), label: 9 },
            Feature { polygon: square(5.0, 0.0), label: 2 },
            Feature { polygon: square(7.0, 0.0), label: 2 },
        ];
        let dissolved = dissolve_by_label(features);
        assert_eq!(dissolved.len(), 2);
        assert_eq!(dissolved[0].0, 2);
        assert_eq!(dissolved[1].0, 9);
        // The two label-2 squares are disjoint, so they stay separate
        // parts of one multipolygon.
        assert_eq!(dissolved[0].1 .0.len(), 2);
    }
}
