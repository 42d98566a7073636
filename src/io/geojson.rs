//! GeoJSON reading and writing for vector tiles and the final output.
//!
//! Feature collections are built and parsed directly with `serde_json`
//! values; each feature carries its integer label under a configurable
//! property name.

use std::fs;
use std::path::Path;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::tiler::{Feature, FeatureSet};

fn ring_json(ring: &LineString<f64>) -> Value {
    Value::Array(
        ring.coords()
            .map(|c| json!([c.x, c.y]))
            .collect::<Vec<Value>>(),
    )
}

fn polygon_json(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_json));
    Value::Array(rings)
}

fn feature_json(geometry: Value, geometry_type: &str, label: i32, label_name: &str) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(label_name.to_string(), json!(label));
    json!({
        "type": "Feature",
        "geometry": {
            "type": geometry_type,
            "coordinates": geometry,
        },
        "properties": Value::Object(properties),
    })
}

fn write_collection(path: &Path, features: Vec<Value>) -> Result<()> {
    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    let bytes =
        serde_json::to_vec(&collection).map_err(|e| Error::Serialize(e.to_string()))?;
    fs::write(path, bytes).map_err(|e| Error::TileIo {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write one polygon feature per entry of the set.
pub fn write_feature_set(path: &Path, set: &FeatureSet, label_name: &str) -> Result<()> {
    let features = set
        .features
        .iter()
        .map(|f| feature_json(polygon_json(&f.polygon), "Polygon", f.label, label_name))
        .collect();
    write_collection(path, features)
}

/// Write one multipolygon feature per label.
pub fn write_label_features(
    path: &Path,
    items: &[(i32, MultiPolygon<f64>)],
    label_name: &str,
) -> Result<()> {
    let features = items
        .iter()
        .map(|(label, mp)| {
            let coordinates = Value::Array(mp.0.iter().map(polygon_json).collect());
            feature_json(coordinates, "MultiPolygon", *label, label_name)
        })
        .collect();
    write_collection(path, features)
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let coords = value
        .as_array()
        .ok_or_else(|| Error::Serialize("ring is not an array".into()))?
        .iter()
        .map(|pair| {
            let xy = pair
                .as_array()
                .filter(|xy| xy.len() >= 2)
                .ok_or_else(|| Error::Serialize("coordinate is not a pair".into()))?;
            Ok(Coord {
                x: xy[0].as_f64().unwrap_or(f64::NAN),
                y: xy[1].as_f64().unwrap_or(f64::NAN),
            })
        })
        .collect::<Result<Vec<Coord<f64>>>>()?;
    Ok(LineString::new(coords))
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| Error::Serialize("polygon is not an array of rings".into()))?;
    let mut iter = rings.iter();
    let exterior = match iter.next() {
        Some(ring) => parse_ring(ring)?,
        None => LineString::new(Vec::new()),
    };
    let interiors = iter.map(parse_ring).collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Read a feature collection of polygon features written by
/// [`write_feature_set`].
pub fn read_feature_set(path: &Path, label_name: &str) -> Result<FeatureSet> {
    let bytes = fs::read(path).map_err(|e| Error::TileIo {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value =
        serde_json::from_slice(&bytes).map_err(|e| Error::Serialize(e.to_string()))?;

    let mut features = Vec::new();
    if let Some(list) = value["features"].as_array() {
        for feature in list {
            let label = feature["properties"][label_name]
                .as_i64()
                .ok_or_else(|| Error::Serialize(format!("feature lacks `{label_name}`")))?
                as i32;
            let geometry = &feature["geometry"];
            match geometry["type"].as_str() {
                Some("Polygon") => features.push(Feature {
                    polygon: parse_polygon(&geometry["coordinates"])?,
                    label,
                }),
                Some("MultiPolygon") => {
                    if let Some(polygons) = geometry["coordinates"].as_array() {
                        for polygon in polygons {
                            features.push(Feature {
                                polygon: parse_polygon(polygon)?,
                                label,
                            });
                        }
                    }
                }
                other => {
                    return Err(Error::Serialize(format!(
                        "unsupported geometry type: {other:?}"
                    )))
                }
            }
        }
    }
    Ok(FeatureSet::new(features))
}
