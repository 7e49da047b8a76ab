//! Area totals per compliance class

use super::overlay::Classification;
use geo::Area;

/// Square metres per square kilometre
pub const M2_PER_KM2: f64 = 1_000_000.0;

/// Areas (km²) and the illegal site count
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AreaTotals {
    pub total_detected_km2: f64,
    pub legal_km2: f64,
    pub illegal_km2: f64,
    pub illegal_count: usize,
}

/// Sum the classified areas, in the overlay CRS, converted to km².
pub fn account_areas(classification: &Classification) -> AreaTotals {
    let total: f64 = classification
        .detected
        .iter()
        .map(|f| f.geometry.unsigned_area())
        .sum();
    let legal: f64 = classification.legal.iter().map(|p| p.area_m2).sum();
    let illegal: f64 = classification.illegal.iter().map(|p| p.area_m2).sum();

    AreaTotals {
        total_detected_km2: total / M2_PER_KM2,
        legal_km2: legal / M2_PER_KM2,
        illegal_km2: illegal / M2_PER_KM2,
        illegal_count: classification.illegal.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::overlay::classify;
    use crate::parallel::ProcessingMode;
    use approx::assert_relative_eq;
    use geo::polygon;
    use pitscan_core::{PolygonFeature, PolygonSet, CRS};

    fn utm(coords: &[(f64, f64, f64, f64)]) -> PolygonSet {
        let features = coords
            .iter()
            .map(|&(x0, y0, x1, y1)| {
                PolygonFeature::from_polygon(polygon![
                    (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1),
                ])
            })
            .collect();
        PolygonSet::from_features(features, Some(CRS::from_epsg(32645)))
    }

    #[test]
    fn test_totals_in_km2_and_conserved() {
        let classification = classify(
            &utm(&[(0.0, 0.0, 2000.0, 2000.0)]),
            &utm(&[(1900.0, 0.0, 2100.0, 200.0), (100.0, 100.0, 300.0, 300.0)]),
            &CRS::from_epsg(32645),
            ProcessingMode::Sequential,
        )
        .unwrap();

        let totals = account_areas(&classification);
        assert_relative_eq!(totals.total_detected_km2, 0.08, epsilon = 1e-12);
        assert_relative_eq!(totals.legal_km2, 0.06, epsilon = 1e-12);
        assert_relative_eq!(totals.illegal_km2, 0.02, epsilon = 1e-12);
        assert_eq!(totals.illegal_count, 1);
        assert_relative_eq!(
            totals.legal_km2 + totals.illegal_km2,
            totals.total_detected_km2,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_empty_input_is_zero() {
        let classification = classify(
            &utm(&[]),
            &utm(&[]),
            &CRS::from_epsg(32645),
            ProcessingMode::Sequential,
        )
        .unwrap();
        assert_eq!(account_areas(&classification), AreaTotals::default());
    }
}
