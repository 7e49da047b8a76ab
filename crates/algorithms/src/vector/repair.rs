//! Best-effort repair of malformed input polygons
//!
//! Repair runs in three steps:
//! 1. Drop consecutive duplicate vertices
//! 2. Drop rings with fewer than three distinct vertices, or collinear ones
//! 3. Re-normalize anything still invalid (self-intersections, bad
//!    orientation) by passing it through a boolean union

use geo::{
    Area, BooleanOps, CoordsIter, LineString, MultiPolygon, Polygon, RemoveRepeatedPoints,
    Validation,
};
use pitscan_core::{PolygonFeature, PolygonSet};
use tracing::{debug, warn};

/// Outcome of repairing one record
#[derive(Debug, Clone, PartialEq)]
pub enum Repair {
    /// Already valid, returned as is
    Valid(MultiPolygon<f64>),
    /// Fixed up; the new geometry
    Repaired(MultiPolygon<f64>),
    /// Could not be made usable; the reason
    Unrepairable(String),
}

/// Repair one polygonal geometry
pub fn repair_geometry(geometry: &MultiPolygon<f64>) -> Repair {
    if geometry.coords_iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Repair::Unrepairable("non-finite coordinate".into());
    }
    if geometry.is_valid() && geometry.unsigned_area() > 0.0 {
        return Repair::Valid(geometry.clone());
    }

    let cleaned = MultiPolygon::new(
        geometry
            .remove_repeated_points()
            .into_iter()
            .filter_map(drop_degenerate_rings)
            .collect(),
    );
    if cleaned.0.is_empty() {
        return Repair::Unrepairable("no ring encloses any area".into());
    }
    if cleaned.is_valid() {
        return Repair::Repaired(cleaned);
    }

    let normalized = cleaned.union(&MultiPolygon::new(Vec::new()));
    if normalized.0.is_empty() || normalized.unsigned_area() == 0.0 {
        return Repair::Unrepairable("nothing left after union".into());
    }
    Repair::Repaired(normalized)
}

fn drop_degenerate_rings(polygon: Polygon<f64>) -> Option<Polygon<f64>> {
    let (exterior, interiors) = polygon.into_inner();
    if is_degenerate(&exterior) {
        return None;
    }
    let interiors = interiors.into_iter().filter(|r| !is_degenerate(r)).collect();
    Some(Polygon::new(exterior, interiors))
}

/// Fewer than three distinct vertices, or all vertices on one line
fn is_degenerate(ring: &LineString<f64>) -> bool {
    if ring.0.len() < 4 {
        return true;
    }
    let origin = ring.0[0];
    let Some(direction) = ring.0.iter().find(|c| **c != origin).map(|c| *c - origin) else {
        return true;
    };
    let scale = direction.x.abs().max(direction.y.abs());
    ring.0.iter().all(|c| {
        let d = *c - origin;
        (direction.x * d.y - direction.y * d.x).abs() <= 1e-12 * scale * scale.max(1.0)
    })
}

/// Repair every record of a set, dropping the ones that cannot be fixed.
///
/// Returns the cleaned set and the number of records dropped.
pub fn repair_set(set: &PolygonSet, label: &str) -> (PolygonSet, usize) {
    let mut cleaned = PolygonSet::new(set.crs.clone());
    let mut dropped = 0;

    for (index, feature) in set.iter().enumerate() {
        match repair_geometry(&feature.geometry) {
            Repair::Valid(geometry) => cleaned.push(PolygonFeature {
                geometry,
                properties: feature.properties.clone(),
            }),
            Repair::Repaired(geometry) => {
                debug!("{} record {} repaired", label, index);
                cleaned.push(PolygonFeature {
                    geometry,
                    properties: feature.properties.clone(),
                });
            }
            Repair::Unrepairable(reason) => {
                warn!("{} record {} skipped: invalid geometry ({})", label, index, reason);
                dropped += 1;
            }
        }
    }

    (cleaned, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_valid_polygon_untouched() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0),
        ]]);
        assert_eq!(repair_geometry(&square), Repair::Valid(square.clone()));
    }

    #[test]
    fn test_repeated_points_removed() {
        let ring = LineString::from(vec![
            (0.0, 0.0), (0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0),
        ]);
        let geometry = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
        match repair_geometry(&geometry) {
            Repair::Valid(g) | Repair::Repaired(g) => {
                assert!((g.unsigned_area() - 100.0).abs() < 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bowtie_is_normalized() {
        // Self-intersecting figure eight: two 5x5 triangles
        let ring = LineString::from(vec![
            (0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0), (0.0, 0.0),
        ]);
        let geometry = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
        match repair_geometry(&geometry) {
            Repair::Repaired(g) => {
                assert!((g.unsigned_area() - 50.0).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_collapsed_polygon_is_unrepairable() {
        let line = LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (10.0, 0.0), (0.0, 0.0)]);
        let geometry = MultiPolygon::new(vec![Polygon::new(line, vec![])]);
        assert!(matches!(repair_geometry(&geometry), Repair::Unrepairable(_)));

        let nan = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: f64::NAN, y: 0.0), (x: 1.0, y: 1.0),
        ]]);
        assert!(matches!(repair_geometry(&nan), Repair::Unrepairable(_)));
    }

    #[test]
    fn test_repair_set_counts_dropped_records() {
        let good = PolygonFeature::from_polygon(polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0),
        ]);
        let bad = PolygonFeature::from_polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]),
            vec![],
        ));
        let set = PolygonSet::from_features(vec![good, bad], None);
        let (cleaned, dropped) = repair_set(&set, "detected");
        assert_eq!(cleaned.len(), 1);
        assert_eq!(dropped, 1);
    }
}
