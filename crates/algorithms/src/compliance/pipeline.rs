//! The `analyze` entry point: reconcile, classify, account, estimate, aggregate

use super::area::{account_areas, M2_PER_KM2};
use super::overlay::{classify, Classification};
use super::reconcile::reconcile;
use super::report::{aggregate, AnalysisReport, ReportInputs};
use super::volume::{estimate_volume, ExcavationSite, SiteEstimate, VolumeParams};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::vector::repair_set;
use geo::MultiPolygon;
use pitscan_core::io::read_geotiff;
use pitscan_core::{CrsTransform, PolygonSet, Projection, Raster, RasterSource, CRS};
use std::path::Path;
use tracing::{debug, info, warn};

/// Timestamp format of `summary.analysis_timestamp` (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Classify `detected` against `authorized` and estimate every illegal site's volume.
///
/// Fails only for request-level problems (no usable reference frame, bad
/// configuration, reprojection outside the supported CRS). Sites the DEM
/// cannot measure are reported as unestimable.
pub fn analyze<R>(
    authorized: &PolygonSet,
    detected: &PolygonSet,
    dem: &R,
    config: &AnalysisConfig,
) -> Result<AnalysisReport>
where
    R: RasterSource + ?Sized,
{
    let timestamp = chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string();
    analyze_at(authorized, detected, dem, config, timestamp)
}

/// [`analyze`] with a caller-supplied timestamp
pub fn analyze_at<R>(
    authorized: &PolygonSet,
    detected: &PolygonSet,
    dem: &R,
    config: &AnalysisConfig,
    timestamp: String,
) -> Result<AnalysisReport>
where
    R: RasterSource + ?Sized,
{
    config.validate().map_err(AnalysisError::InvalidConfig)?;
    info!(
        "analyzing {} detected footprint(s) against {} authorized polygon(s)",
        detected.len(),
        authorized.len()
    );

    let reconciled = reconcile(authorized, detected, config.missing_crs_policy)?;
    let (authorized, invalid_authorized) = repair_set(&reconciled.authorized, "authorized");
    let (detected, invalid_detected) = repair_set(&reconciled.detected, "detected");

    let classification = classify(&authorized, &detected, &config.area_crs, config.processing)?;
    let totals = account_areas(&classification);
    info!(
        "detected {:.6} km², legal {:.6} km², illegal {:.6} km² in {} site(s)",
        totals.total_detected_km2, totals.legal_km2, totals.illegal_km2, totals.illegal_count
    );

    let site_crs = dem.crs().cloned().unwrap_or_else(|| {
        debug!("DEM has no CRS, assuming {}", reconciled.crs);
        reconciled.crs.clone()
    });
    let sites = estimate_sites(&classification, dem, &site_crs, config)?;

    let illegal_polygons = classification.illegal_layer().reprojected(&reconciled.crs)?;
    let legal_polygons = classification.legal_layer().reprojected(&reconciled.crs)?;

    let report = aggregate(
        ReportInputs {
            totals: &totals,
            sites: &sites,
            illegal_polygons: &illegal_polygons,
            legal_polygons: &legal_polygons,
            invalid_geometries: invalid_authorized + invalid_detected,
            unestimable_policy: config.unestimable_policy,
        },
        timestamp,
    );
    info!(
        "illegal volume {:.1} m³ ({})",
        report.summary.illegal_mining_volume_m3, report.summary.status
    );
    Ok(report)
}

/// Fan out volume estimation over the illegal parts, one site per part
fn estimate_sites<R>(
    classification: &Classification,
    dem: &R,
    site_crs: &CRS,
    config: &AnalysisConfig,
) -> Result<Vec<ExcavationSite>>
where
    R: RasterSource + ?Sized,
{
    let to_dem = CrsTransform::new(&classification.crs, site_crs)?;
    if Projection::from_crs(site_crs).is_ok_and(|p| !p.is_projected()) {
        warn!(
            "DEM is in geographic {}; buffer distance {} is applied in degrees",
            site_crs, config.buffer_distance
        );
    }

    let params = VolumeParams::from(config);
    let sites = config
        .processing
        .par_map(classification.illegal.len(), |index| {
            let part = &classification.illegal[index];
            let footprint = MultiPolygon::new(vec![to_dem.transform(&part.polygon)]);
            let site = ExcavationSite {
                pit_id: index + 1,
                area_km2: part.area_m2 / M2_PER_KM2,
                estimate: estimate_volume(dem, &footprint, &params),
            };
            if let SiteEstimate::Unestimable(reason) = site.estimate {
                warn!("site {} unestimable: {}", site.pit_id, reason);
            }
            site
        });
    Ok(sites)
}

/// Open a GeoTIFF DEM.
///
/// The file is decoded fully and its handle closed before this returns.
pub fn open_dem<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    let path = path.as_ref();
    let unreadable = |reason: String| AnalysisError::UnreadableRaster {
        path: path.display().to_string(),
        reason,
    };

    let dem: Raster<f64> = read_geotiff(path).map_err(|e| unreadable(e.to_string()))?;
    if dem.is_empty() {
        return Err(unreadable("raster has no cells".into()));
    }
    debug!(
        "DEM {}: {}x{} cells, CRS {}",
        path.display(),
        dem.rows(),
        dem.cols(),
        dem.crs().map_or("unknown".to_string(), |c| c.identifier())
    );
    Ok(dem)
}
