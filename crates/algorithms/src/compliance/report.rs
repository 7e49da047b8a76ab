//! Assembly of the final analysis report

use super::area::AreaTotals;
use super::volume::{ExcavationSite, SiteEstimate};
use crate::config::UnestimablePolicy;
use geojson::FeatureCollection;
use pitscan_core::PolygonSet;
use serde::Serialize;

/// Every site was estimated
pub const STATUS_SUCCESS: &str = "COMPLETED_SUCCESS";
/// At least one illegal site has no volume
pub const STATUS_WITH_UNESTIMABLE: &str = "COMPLETED_WITH_UNESTIMABLE_SITES";

/// Terminal result of an analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: Summary,
    pub illegal_operations: Vec<SiteRecord>,
    pub geospatial_data: GeospatialData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_detected_area_km2: f64,
    pub legal_mining_area_km2: f64,
    pub illegal_mining_area_km2: f64,
    /// Sum over estimated sites only
    pub illegal_mining_volume_m3: f64,
    pub illegal_operations_count: usize,
    pub analysis_timestamp: String,
    pub status: &'static str,
    pub unestimable_operations_count: usize,
    pub invalid_geometries_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SiteStatus {
    Computed,
    Unestimable,
}

/// One entry of `illegal_operations`; figures are null for unestimable sites
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteRecord {
    pub pit_id: usize,
    pub volume_m3: Option<f64>,
    pub avg_depth_m: Option<f64>,
    pub max_depth_m: Option<f64>,
    pub original_surface_m: Option<f64>,
    pub area_km2: f64,
    pub status: SiteStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&ExcavationSite> for SiteRecord {
    fn from(site: &ExcavationSite) -> Self {
        match site.estimate {
            SiteEstimate::Computed(m) => SiteRecord {
                pit_id: site.pit_id,
                volume_m3: Some(m.volume_m3),
                avg_depth_m: Some(m.avg_depth_m),
                max_depth_m: Some(m.max_depth_m),
                original_surface_m: Some(m.original_surface_m),
                area_km2: site.area_km2,
                status: SiteStatus::Computed,
                reason: None,
            },
            SiteEstimate::Unestimable(reason) => SiteRecord {
                pit_id: site.pit_id,
                volume_m3: None,
                avg_depth_m: None,
                max_depth_m: None,
                original_surface_m: None,
                area_km2: site.area_km2,
                status: SiteStatus::Unestimable,
                reason: Some(reason.to_string()),
            },
        }
    }
}

/// Classified polygons in the authorized-boundary CRS
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeospatialData {
    pub illegal_polygons: FeatureCollection,
    pub legal_polygons: FeatureCollection,
}

/// Everything the aggregator combines
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub totals: &'a AreaTotals,
    pub sites: &'a [ExcavationSite],
    /// Illegal parts, already in the CRS the caller gets geometries back in
    pub illegal_polygons: &'a PolygonSet,
    /// Legal parts, same CRS
    pub legal_polygons: &'a PolygonSet,
    pub invalid_geometries: usize,
    pub unestimable_policy: UnestimablePolicy,
}

/// Combine totals, per-site estimates and classified geometries.
///
/// Pure assembly: no geometry work, and `timestamp` is stamped as given.
pub fn aggregate(inputs: ReportInputs<'_>, timestamp: String) -> AnalysisReport {
    let ReportInputs {
        totals,
        sites,
        illegal_polygons,
        legal_polygons,
        invalid_geometries,
        unestimable_policy,
    } = inputs;

    let volume: f64 = sites
        .iter()
        .filter_map(|s| s.estimate.metrics())
        .map(|m| m.volume_m3)
        .sum();
    let unestimable = sites.iter().filter(|s| !s.estimate.is_computed()).count();

    let illegal_operations = sites
        .iter()
        .filter(|s| s.estimate.is_computed() || unestimable_policy == UnestimablePolicy::Flag)
        .map(SiteRecord::from)
        .collect();

    AnalysisReport {
        summary: Summary {
            total_detected_area_km2: totals.total_detected_km2,
            legal_mining_area_km2: totals.legal_km2,
            illegal_mining_area_km2: totals.illegal_km2,
            illegal_mining_volume_m3: volume,
            illegal_operations_count: totals.illegal_count,
            analysis_timestamp: timestamp,
            status: if unestimable == 0 {
                STATUS_SUCCESS
            } else {
                STATUS_WITH_UNESTIMABLE
            },
            unestimable_operations_count: unestimable,
            invalid_geometries_count: invalid_geometries,
        },
        illegal_operations,
        geospatial_data: GeospatialData {
            illegal_polygons: illegal_polygons.to_feature_collection(),
            legal_polygons: legal_polygons.to_feature_collection(),
        },
    }
}
