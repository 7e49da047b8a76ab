//! Polygon layer reading/writing: GeoJSON and ESRI Shapefile

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, PolygonFeature, PolygonSet, Properties};
use geo_types::MultiPolygon;
use geojson::GeoJson;
use shapefile::dbase::FieldValue;
use shapefile::{Reader, Shape};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, warn};

/// Read a polygon layer, choosing the format from the file extension.
///
/// `.geojson`/`.json` are GeoJSON, `.shp` is a Shapefile (with an optional
/// sibling `.prj`).
pub fn read_polygons<P: AsRef<Path>>(path: P) -> Result<PolygonSet> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "geojson" | "json" => read_geojson(path),
        "shp" => read_shapefile(path),
        other => Err(Error::UnsupportedFormat(format!(
            "'{}' ({})",
            other,
            path.display()
        ))),
    }
}

/// Read a GeoJSON FeatureCollection (a single Feature is accepted too)
pub fn read_geojson<P: AsRef<Path>>(path: P) -> Result<PolygonSet> {
    let file = File::open(path.as_ref())?;
    let collection = match GeoJson::from_reader(BufReader::new(file))? {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => geojson::FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => {
            return Err(Error::GeoJson(
                "expected a FeatureCollection, found a bare geometry".to_string(),
            ))
        }
    };
    let set = PolygonSet::from_feature_collection(collection)?;
    debug!(
        "read {} polygon features from {}",
        set.len(),
        path.as_ref().display()
    );
    Ok(set)
}

/// Write a polygon set as a GeoJSON FeatureCollection
pub fn write_geojson<P: AsRef<Path>>(set: &PolygonSet, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer(BufWriter::new(file), &set.to_feature_collection())?;
    Ok(())
}

/// Read the polygon records of a Shapefile together with their dBASE attributes.
///
/// The CRS is taken from the `.prj` next to the `.shp`, if there is one.
pub fn read_shapefile<P: AsRef<Path>>(path: P) -> Result<PolygonSet> {
    let path = path.as_ref();
    let mut reader = Reader::from_path(path)?;
    let mut set = PolygonSet::new(read_prj(path)?);

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;
        let geometry: MultiPolygon<f64> = match shape {
            Shape::Polygon(polygon) => polygon
                .try_into()
                .map_err(|e| Error::Shapefile(format!("record {}: {:?}", index, e)))?,
            Shape::PolygonM(polygon) => polygon
                .try_into()
                .map_err(|e| Error::Shapefile(format!("record {}: {:?}", index, e)))?,
            Shape::PolygonZ(polygon) => polygon
                .try_into()
                .map_err(|e| Error::Shapefile(format!("record {}: {:?}", index, e)))?,
            Shape::NullShape => {
                warn!("record {} has a null shape, skipped", index);
                continue;
            }
            other => {
                warn!("record {} is a {:?} shape, skipped", index, other.shapetype());
                continue;
            }
        };

        let properties: Properties = HashMap::<String, FieldValue>::from(record)
            .into_iter()
            .map(|(name, value)| (name, field_value(value)))
            .collect();

        set.push(PolygonFeature {
            geometry,
            properties,
        });
    }

    debug!("read {} polygon records from {}", set.len(), path.display());
    Ok(set)
}

fn read_prj(shp: &Path) -> Result<Option<CRS>> {
    let prj = shp.with_extension("prj");
    if !prj.exists() {
        return Ok(None);
    }
    let wkt = fs::read_to_string(&prj)?;
    let crs = CRS::from_wkt(wkt.trim());
    if crs.epsg().is_none() {
        warn!(
            "{} has no recognizable EPSG authority; CRS kept as WKT only",
            prj.display()
        );
    }
    Ok(Some(crs))
}

fn field_value(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            AttributeValue::String(s.trim_end().to_string())
        }
        FieldValue::Numeric(Some(n)) | FieldValue::Double(n) | FieldValue::Currency(n) => {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                AttributeValue::Int(n as i64)
            } else {
                AttributeValue::Float(n)
            }
        }
        FieldValue::Float(Some(f)) => AttributeValue::Float(f as f64),
        FieldValue::Integer(i) => AttributeValue::Int(i as i64),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        _ => AttributeValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_extension_is_rejected() {
        let err = read_polygons("boundaries.kml").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_read_geojson_single_feature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pit.geojson");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"type":"Feature","properties":{{"id":7}},
               "geometry":{{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}}}}"#
        )
        .unwrap();

        let set = read_polygons(&path).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.crs.is_none());
        assert_eq!(set.features[0].get_property("id"), Some(&AttributeValue::Int(7)));
    }

    #[test]
    fn test_malformed_geojson_is_a_geojson_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.geojson");
        fs::write(&path, r#"{"type":"FeatureCollection","features":[{"#).unwrap();

        let err = read_polygons(&path).unwrap_err();
        assert!(matches!(err, Error::GeoJson(_)), "{:?}", err);
    }

    #[test]
    fn test_numeric_fields_become_integers_when_whole() {
        assert_eq!(field_value(FieldValue::Numeric(Some(12.0))), AttributeValue::Int(12));
        assert_eq!(field_value(FieldValue::Numeric(Some(1.5))), AttributeValue::Float(1.5));
        assert_eq!(field_value(FieldValue::Character(None)), AttributeValue::Null);
        assert_eq!(
            field_value(FieldValue::Character(Some("L-04   ".into()))),
            AttributeValue::String("L-04".into())
        );
    }
}
