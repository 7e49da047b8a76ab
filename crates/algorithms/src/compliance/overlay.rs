//! Legal/illegal classification by polygon overlay
//!
//! Every detected footprint is split against the union of the authorized
//! boundary: the part inside is legal (intersection), the part outside is
//! illegal (difference). Both are computed in an equal-area CRS so the
//! planar areas that follow are ground areas.

use crate::error::{AnalysisError, Result};
use crate::parallel::ProcessingMode;
use geo::{unary_union, Area, BooleanOps, CoordsIter, MultiPolygon, Polygon};
use super::area::M2_PER_KM2;
use pitscan_core::{AttributeValue, PolygonFeature, PolygonSet, Properties, CRS};
use serde::Serialize;
use tracing::debug;

/// Compliance class of an overlay output record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolygonClass {
    Legal,
    Illegal,
}

/// One single-part overlay output record
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPolygon {
    pub class: PolygonClass,
    pub polygon: Polygon<f64>,
    /// Index of the detected feature this part came from
    pub source_index: usize,
    /// Attributes of that detected feature
    pub properties: Properties,
    /// Planar area in the overlay CRS (m²)
    pub area_m2: f64,
}

/// Overlay output, all geometries in `crs`
#[derive(Debug, Clone)]
pub struct Classification {
    pub legal: Vec<ClassifiedPolygon>,
    pub illegal: Vec<ClassifiedPolygon>,
    /// The detected set as projected for the overlay
    pub detected: PolygonSet,
    pub crs: CRS,
}

/// Split the detected footprints into legal and illegal parts.
///
/// Both sets must carry a CRS (see [`reconcile`](super::reconcile)). Parts
/// are listed per detected feature, in input order; multi-part results are
/// exploded into separate records. Zero-area slivers are kept.
pub fn classify(
    authorized: &PolygonSet,
    detected: &PolygonSet,
    area_crs: &CRS,
    mode: ProcessingMode,
) -> Result<Classification> {
    let authorized = project(authorized, area_crs, "authorized boundary")?;
    let detected = project(detected, area_crs, "detections")?;

    let boundary: MultiPolygon<f64> =
        unary_union(authorized.iter().flat_map(|f| f.geometry.0.iter()));
    debug!(
        "authorized boundary: {} feature(s) dissolved into {} polygon(s)",
        authorized.len(),
        boundary.0.len()
    );

    let split = mode.par_map(detected.len(), |index| {
        let feature = &detected.features[index];
        let legal = feature.geometry.intersection(&boundary);
        let illegal = feature.geometry.difference(&boundary);
        (
            explode(legal, PolygonClass::Legal, index, &feature.properties),
            explode(illegal, PolygonClass::Illegal, index, &feature.properties),
        )
    });

    let (mut legal, mut illegal) = (Vec::new(), Vec::new());
    for (l, i) in split {
        legal.extend(l);
        illegal.extend(i);
    }
    debug!("overlay: {} legal part(s), {} illegal part(s)", legal.len(), illegal.len());

    Ok(Classification {
        legal,
        illegal,
        detected,
        crs: area_crs.clone(),
    })
}

impl Classification {
    /// Illegal parts as a layer in `crs`, tagged with `area_km2` and a 1-based `pit_id`
    pub fn illegal_layer(&self) -> PolygonSet {
        self.layer(&self.illegal, true)
    }

    /// Legal parts as a layer in `crs`, tagged with `area_km2`
    pub fn legal_layer(&self) -> PolygonSet {
        self.layer(&self.legal, false)
    }

    fn layer(&self, parts: &[ClassifiedPolygon], numbered: bool) -> PolygonSet {
        let features = parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let mut feature = PolygonFeature::from_polygon(part.polygon.clone());
                feature.properties = part.properties.clone();
                feature
                    .properties
                    .insert("area_km2".into(), AttributeValue::Float(part.area_m2 / M2_PER_KM2));
                if numbered {
                    feature
                        .properties
                        .insert("pit_id".into(), AttributeValue::Int(i as i64 + 1));
                }
                feature
            })
            .collect();
        PolygonSet::from_features(features, Some(self.crs.clone()))
    }
}

fn project(set: &PolygonSet, target: &CRS, label: &str) -> Result<PolygonSet> {
    let projected = set.reprojected(target)?;
    let finite = projected
        .iter()
        .all(|f| f.geometry.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()));
    if !finite {
        return Err(AnalysisError::Overlay(format!(
            "{} falls outside the valid extent of {}",
            label, target
        )));
    }
    Ok(projected)
}

fn explode(
    parts: MultiPolygon<f64>,
    class: PolygonClass,
    source_index: usize,
    properties: &Properties,
) -> Vec<ClassifiedPolygon> {
    parts
        .into_iter()
        .map(|polygon| ClassifiedPolygon {
            class,
            area_m2: polygon.unsigned_area(),
            polygon,
            source_index,
            properties: properties.clone(),
        })
        .collect()
}
