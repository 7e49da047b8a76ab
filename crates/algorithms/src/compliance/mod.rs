//! Excavation compliance analysis
//!
//! The pipeline behind [`analyze`]:
//! - Reconcile: bring both polygon sets into one CRS
//! - Overlay: split detections into legal and illegal parts (equal-area CRS)
//! - Area: km² totals per class and the illegal site count
//! - Volume: per illegal site, DEM clip, reference surface, depth and volume
//! - Report: summary, per-site records and the classified layers

mod area;
mod overlay;
mod pipeline;
mod reconcile;
mod report;
mod volume;

pub use area::{account_areas, AreaTotals, M2_PER_KM2};
pub use overlay::{classify, Classification, ClassifiedPolygon, PolygonClass};
pub use pipeline::{analyze, analyze_at, open_dem, TIMESTAMP_FORMAT};
pub use reconcile::{reconcile, Reconciled};
pub use report::{
    aggregate, AnalysisReport, GeospatialData, ReportInputs, SiteRecord, SiteStatus, Summary,
    STATUS_SUCCESS, STATUS_WITH_UNESTIMABLE,
};
pub use volume::{
    depth_field, estimate_volume, reference_surface, ExcavationSite, SiteEstimate,
    UnestimableReason, VolumeMetrics, VolumeParams,
};
