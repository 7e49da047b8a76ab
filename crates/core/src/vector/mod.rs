//! Polygon feature sets: geometry + attributes + an optional CRS

use crate::crs::{CrsTransform, CRS};
use crate::error::{Error, Result};
use geo_types::{Geometry, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&JsonValue> for AttributeValue {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => AttributeValue::Null,
            JsonValue::Bool(b) => AttributeValue::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => AttributeValue::String(s.clone()),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

impl From<&AttributeValue> for JsonValue {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => JsonValue::Null,
            AttributeValue::Bool(b) => JsonValue::Bool(*b),
            AttributeValue::Int(i) => JsonValue::from(*i),
            AttributeValue::Float(f) => JsonValue::from(*f),
            AttributeValue::String(s) => JsonValue::String(s.clone()),
        }
    }
}

/// Attribute table of one feature, ordered by key
pub type Properties = BTreeMap<String, AttributeValue>;

/// One polygonal record (possibly multi-part, possibly with holes)
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: Properties,
}

impl PolygonFeature {
    pub fn new(geometry: MultiPolygon<f64>) -> Self {
        Self {
            geometry,
            properties: Properties::new(),
        }
    }

    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]))
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// An ordered collection of polygon features sharing one (optional) CRS.
///
/// Authorized boundaries and detected excavation footprints both use this
/// shape. A missing CRS is legal here; the analysis decides what to do
/// about it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSet {
    pub features: Vec<PolygonFeature>,
    pub crs: Option<CRS>,
}

impl PolygonSet {
    pub fn new(crs: Option<CRS>) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn from_features(features: Vec<PolygonFeature>, crs: Option<CRS>) -> Self {
        Self { features, crs }
    }

    pub fn push(&mut self, feature: PolygonFeature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolygonFeature> {
        self.features.iter()
    }

    /// Same features, CRS label replaced; coordinates untouched
    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    /// Reproject every feature into `target`.
    pub fn reprojected(&self, target: &CRS) -> Result<PolygonSet> {
        let source = self
            .crs
            .as_ref()
            .ok_or_else(|| Error::UnsupportedCrs("polygon set has no CRS".to_string()))?;
        let transform = CrsTransform::new(source, target)?;
        let features = self
            .features
            .iter()
            .map(|f| PolygonFeature {
                geometry: transform.transform(&f.geometry),
                properties: f.properties.clone(),
            })
            .collect();
        Ok(PolygonSet::from_features(features, Some(target.clone())))
    }

    /// Build from a GeoJSON feature collection.
    ///
    /// The CRS comes from the legacy `crs` member, if present. Features
    /// without a polygonal geometry are skipped.
    pub fn from_feature_collection(collection: FeatureCollection) -> Result<Self> {
        let crs = collection
            .foreign_members
            .as_ref()
            .and_then(geojson_crs)
            .map(|name| name.parse::<CRS>())
            .transpose()?;

        let mut set = PolygonSet::new(crs);
        for (index, feature) in collection.features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                warn!("feature {} has no geometry, skipped", index);
                continue;
            };
            let geometry: Geometry<f64> = geometry
                .value
                .try_into()
                .map_err(|e: geojson::Error| Error::GeoJson(e.to_string()))?;
            let geometry = match geometry {
                Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                Geometry::MultiPolygon(mp) => mp,
                other => {
                    warn!("feature {} is not polygonal ({:?}), skipped", index, kind(&other));
                    continue;
                }
            };
            let properties = feature
                .properties
                .unwrap_or_default()
                .iter()
                .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
                .collect();
            set.push(PolygonFeature {
                geometry,
                properties,
            });
        }
        Ok(set)
    }

    /// Serialize to a GeoJSON feature collection (geometry + bare attribute table)
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                id: None,
                properties: Some(
                    f.properties
                        .iter()
                        .map(|(k, v)| (k.clone(), JsonValue::from(v)))
                        .collect(),
                ),
                foreign_members: None,
            })
            .collect();

        let foreign_members = self.crs.as_ref().and_then(|crs| crs.ogc_urn()).map(|urn| {
            let mut members = JsonObject::new();
            members.insert(
                "crs".to_string(),
                serde_json::json!({ "type": "name", "properties": { "name": urn } }),
            );
            members
        });

        FeatureCollection {
            bbox: None,
            features,
            foreign_members,
        }
    }
}

impl IntoIterator for PolygonSet {
    type Item = PolygonFeature;
    type IntoIter = std::vec::IntoIter<PolygonFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Name of a legacy GeoJSON `crs` member: `{"type": "name", "properties": {"name": ...}}`
fn geojson_crs(members: &JsonObject) -> Option<&str> {
    members.get("crs")?.get("properties")?.get("name")?.as_str()
}

fn kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => "point",
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => "line",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::32645" } },
        "features": [
            { "type": "Feature", "properties": { "lease_id": 1, "name": "north pit" },
              "geometry": { "type": "Polygon",
                "coordinates": [[[0,0],[200,0],[200,200],[0,200],[0,0]]] } },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Point", "coordinates": [5, 5] } }
        ]
    }"#;

    fn parse(text: &str) -> PolygonSet {
        let fc: FeatureCollection = text.parse().unwrap();
        PolygonSet::from_feature_collection(fc).unwrap()
    }

    #[test]
    fn test_from_geojson_reads_crs_and_attributes() {
        let set = parse(SAMPLE);
        assert_eq!(set.len(), 1, "point feature is skipped");
        assert_eq!(set.crs.as_ref().and_then(|c| c.epsg()), Some(32645));

        let feature = &set.features[0];
        assert_eq!(feature.get_property("lease_id"), Some(&AttributeValue::Int(1)));
        assert_eq!(
            feature.get_property("name"),
            Some(&AttributeValue::String("north pit".into()))
        );
        assert!((feature.geometry.unsigned_area() - 40_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_crs_member_is_none() {
        let set = parse(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":null,
                 "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#,
        );
        assert!(set.crs.is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_feature_collection_carries_crs_member() {
        let set = parse(SAMPLE);
        let fc = set.to_feature_collection();
        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::32645");
        assert_eq!(json["features"][0]["properties"]["lease_id"], 1);
        assert_eq!(json["features"][0]["geometry"]["type"], "MultiPolygon");
    }

    #[test]
    fn test_reprojected_requires_crs() {
        let set = PolygonSet::from_features(
            vec![PolygonFeature::from_polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 0.0, y: 1.0)])],
            None,
        );
        assert!(set.reprojected(&CRS::wgs84()).is_err());
    }

    #[test]
    fn test_with_crs_keeps_coordinates() {
        let set = parse(SAMPLE);
        let relabeled = set.clone().with_crs(Some(CRS::from_epsg(32646)));
        assert_eq!(relabeled.features, set.features);
        assert_eq!(relabeled.crs.and_then(|c| c.epsg()), Some(32646));
    }
}
