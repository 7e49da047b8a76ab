//! Excavated volume of one illegal site from the DEM
//!
//! The pre-excavation surface is the mean elevation of the terrain in a
//! buffer around the pit. Depth is that surface minus the current
//! elevation, clamped at zero, and volume is the midpoint sum of depth
//! times cell area over the pit's cells.

use crate::config::{AnalysisConfig, ReferenceSurface, SurfaceFallback};
use crate::vector::{buffer_polygon, surrounding_ring};
use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use ndarray::Array2;
use pitscan_core::{Raster, RasterSource};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Parameters for volume estimation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeParams {
    /// Buffer distance in DEM linear units (default: 50)
    pub buffer_distance: f64,
    /// Which part of the buffer samples the reference surface
    pub reference_surface: ReferenceSurface,
    /// Behaviour when the buffer has no valid cells
    pub surface_fallback: SurfaceFallback,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for VolumeParams {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            buffer_distance: config.buffer_distance,
            reference_surface: config.reference_surface,
            surface_fallback: config.surface_fallback,
        }
    }
}

/// Volume and depth figures of an estimated site
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeMetrics {
    pub volume_m3: f64,
    /// Mean over cells with positive depth, 0 when there are none
    pub avg_depth_m: f64,
    /// Max over cells with positive depth, 0 when there are none
    pub max_depth_m: f64,
    pub original_surface_m: f64,
    /// Valid DEM cells inside the pit
    pub cell_count: usize,
    /// Cells with positive depth
    pub excavated_cell_count: usize,
}

/// Why a site has no volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnestimableReason {
    /// The pit does not overlap any valid DEM cell
    NoElevationData,
    /// No reference surface could be established and the fallback is disabled
    NoReferenceSurface,
}

impl fmt::Display for UnestimableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnestimableReason::NoElevationData => write!(f, "no valid DEM cells inside the site"),
            UnestimableReason::NoReferenceSurface => {
                write!(f, "no valid DEM cells around the site to infer the original surface")
            }
        }
    }
}

/// Result of estimating one site
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SiteEstimate {
    Computed(VolumeMetrics),
    Unestimable(UnestimableReason),
}

impl SiteEstimate {
    pub fn metrics(&self) -> Option<&VolumeMetrics> {
        match self {
            SiteEstimate::Computed(m) => Some(m),
            SiteEstimate::Unestimable(_) => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, SiteEstimate::Computed(_))
    }
}

/// One illegal site and its estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExcavationSite {
    /// 1-based position in the illegal set
    pub pit_id: usize,
    /// Area in the overlay CRS
    pub area_km2: f64,
    pub estimate: SiteEstimate,
}

/// Mean elevation of the terrain around a pit.
///
/// `None` when the sampled neighbourhood holds no valid cell.
pub fn reference_surface<R>(dem: &R, site: &MultiPolygon<f64>, params: &VolumeParams) -> Option<f64>
where
    R: RasterSource + ?Sized,
{
    let neighbourhood = match params.reference_surface {
        ReferenceSurface::SurroundingRing => surrounding_ring(site, params.buffer_distance),
        ReferenceSurface::BufferedFootprint => buffer_polygon(site, params.buffer_distance),
    };
    dem.clip(&neighbourhood)?.statistics().mean
}

/// Depth below `original_surface` per cell; no-data and raised cells are 0
pub fn depth_field(elevation: &Raster<f64>, original_surface: f64) -> Array2<f64> {
    elevation.data().mapv(|z| {
        if z.is_nan() {
            0.0
        } else {
            (original_surface - z).max(0.0)
        }
    })
}

/// Estimate the excavated volume of one site.
///
/// `site` must be in the DEM's CRS.
pub fn estimate_volume<R>(dem: &R, site: &MultiPolygon<f64>, params: &VolumeParams) -> SiteEstimate
where
    R: RasterSource + ?Sized,
{
    let Some(current) = dem.clip(site) else {
        return SiteEstimate::Unestimable(UnestimableReason::NoElevationData);
    };
    let cell_count = current.statistics().valid_count;
    let sliver = cell_count == 0 && misses_every_cell_centre(&current, site) && covered(dem, site);
    if cell_count == 0 && !sliver {
        return SiteEstimate::Unestimable(UnestimableReason::NoElevationData);
    }

    let original_surface = match reference_surface(dem, site, params) {
        Some(surface) => surface,
        None => match params.surface_fallback {
            SurfaceFallback::RasterMean => match dem.mean() {
                Some(mean) => {
                    warn!("no valid cells around site, falling back to the DEM mean ({:.2})", mean);
                    mean
                }
                None => return SiteEstimate::Unestimable(UnestimableReason::NoReferenceSurface),
            },
            SurfaceFallback::Skip => {
                return SiteEstimate::Unestimable(UnestimableReason::NoReferenceSurface)
            }
        },
    };

    if sliver {
        debug!("site narrower than a DEM cell, zero volume");
        return SiteEstimate::Computed(VolumeMetrics {
            original_surface_m: original_surface,
            ..Default::default()
        });
    }

    let depth = depth_field(&current, original_surface);
    let cell_area = current.cell_area();

    let (mut sum, mut max, mut excavated) = (0.0_f64, 0.0_f64, 0_usize);
    for &d in depth.iter().filter(|&&d| d > 0.0) {
        sum += d;
        max = max.max(d);
        excavated += 1;
    }

    let metrics = VolumeMetrics {
        volume_m3: sum * cell_area,
        avg_depth_m: if excavated > 0 { sum / excavated as f64 } else { 0.0 },
        max_depth_m: max,
        original_surface_m: original_surface,
        cell_count,
        excavated_cell_count: excavated,
    };
    debug!(
        "site: surface {:.2} m, {} of {} cells excavated, {:.1} m³",
        original_surface, excavated, cell_count, metrics.volume_m3
    );
    SiteEstimate::Computed(metrics)
}

/// No cell centre of the clipped window lies inside `site`
fn misses_every_cell_centre(window: &Raster<f64>, site: &MultiPolygon<f64>) -> bool {
    let gt = window.transform();
    let (rows, cols) = window.shape();
    !(0..rows).any(|row| {
        (0..cols).any(|col| {
            let (x, y) = gt.pixel_to_geo(col, row);
            site.contains(&Point::new(x, y))
        })
    })
}

/// The cells touched by `site`'s bounding box hold valid elevations
fn covered<R>(dem: &R, site: &MultiPolygon<f64>) -> bool
where
    R: RasterSource + ?Sized,
{
    let Some(rect) = site.bounding_rect() else {
        return false;
    };
    // Grow by half a cell so the centres of every touched cell fall inside
    let gt = dem.transform();
    let (hx, hy) = (gt.pixel_width.abs() / 2.0, gt.pixel_height.abs() / 2.0);
    let grown = Rect::new(
        (rect.min().x - hx, rect.min().y - hy),
        (rect.max().x + hx, rect.max().y + hy),
    );
    dem.clip(&MultiPolygon::new(vec![grown.to_polygon()]))
        .is_some_and(|window| window.statistics().valid_count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;
    use pitscan_core::GeoTransform;

    /// 400x400 DEM of 1 m cells at 150 m, with a 200x200 pit at 120 m
    /// occupying x 100..300, y 100..300.
    fn pit_dem() -> Raster<f64> {
        let mut dem = Raster::filled(400, 400, 150.0)
            .with_transform(GeoTransform::new(0.0, 400.0, 1.0, -1.0));
        for row in 100..300 {
            for col in 100..300 {
                dem.set(row, col, 120.0).unwrap();
            }
        }
        dem
    }

    fn square(x0: f64, y0: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
        ]])
    }

    #[test]
    fn test_uniform_pit_volume() {
        let estimate = estimate_volume(&pit_dem(), &square(100.0, 100.0, 200.0), &VolumeParams::default());
        let m = estimate.metrics().copied().unwrap();
        assert_relative_eq!(m.original_surface_m, 150.0, epsilon = 1e-9);
        assert_relative_eq!(m.avg_depth_m, 30.0, epsilon = 1e-9);
        assert_relative_eq!(m.max_depth_m, 30.0, epsilon = 1e-9);
        assert_relative_eq!(m.volume_m3, 1_200_000.0, epsilon = 1e-6);
        assert_eq!(m.cell_count, 40_000);
        assert_eq!(m.excavated_cell_count, 40_000);
    }

    #[test]
    fn test_buffered_footprint_includes_pit_cells() {
        let params = VolumeParams {
            reference_surface: ReferenceSurface::BufferedFootprint,
            ..Default::default()
        };
        let m = estimate_volume(&pit_dem(), &square(100.0, 100.0, 200.0), &params)
            .metrics()
            .copied()
            .unwrap();
        // Pit cells drag the mean below 150, so the estimate is shallower
        assert!(m.original_surface_m < 150.0 && m.original_surface_m > 120.0);
        assert!(m.volume_m3 < 1_200_000.0);
    }

    #[test]
    fn test_depth_never_negative() {
        let mut elevation = Raster::filled(2, 3, 100.0);
        elevation.set(0, 0, 160.0).unwrap();
        elevation.set(0, 1, f64::NAN).unwrap();
        elevation.set(1, 2, 90.0).unwrap();

        let depth = depth_field(&elevation, 110.0);
        assert!(depth.iter().all(|&d| d >= 0.0));
        assert_eq!(depth[[0, 0]], 0.0);
        assert_eq!(depth[[0, 1]], 0.0);
        assert_eq!(depth[[1, 2]], 20.0);
        assert_eq!(depth[[1, 0]], 10.0);
    }

    #[test]
    fn test_lowering_a_cell_increases_volume() {
        let site = square(100.0, 100.0, 200.0);
        let params = VolumeParams::default();
        let base = estimate_volume(&pit_dem(), &site, &params).metrics().copied().unwrap();

        let mut deeper = pit_dem();
        deeper.set(200, 200, 110.0).unwrap();
        let after = estimate_volume(&deeper, &site, &params).metrics().copied().unwrap();

        assert!(after.volume_m3 > base.volume_m3);
        assert_relative_eq!(after.volume_m3 - base.volume_m3, 10.0, epsilon = 1e-6);
        assert_relative_eq!(after.max_depth_m, 40.0);
    }

    #[test]
    fn test_no_dem_overlap_is_unestimable() {
        let estimate = estimate_volume(&pit_dem(), &square(5000.0, 5000.0, 200.0), &VolumeParams::default());
        assert_eq!(estimate, SiteEstimate::Unestimable(UnestimableReason::NoElevationData));
    }

    #[test]
    fn test_sub_cell_sliver_contributes_zero() {
        // 1 mm wide strip along the pit edge: no cell centre inside, fully covered
        let sliver = MultiPolygon::new(vec![polygon![
            (x: 300.0, y: 100.0),
            (x: 300.001, y: 100.0),
            (x: 300.001, y: 300.0),
            (x: 300.0, y: 300.0),
        ]]);
        let m = estimate_volume(&pit_dem(), &sliver, &VolumeParams::default())
            .metrics()
            .copied()
            .unwrap();
        assert_eq!(m.volume_m3, 0.0);
        assert_eq!(m.cell_count, 0);
        assert_eq!(m.excavated_cell_count, 0);
    }

    #[test]
    fn test_sliver_over_nodata_is_unestimable() {
        let dem = Raster::filled(50, 50, -9999.0)
            .with_transform(GeoTransform::new(0.0, 50.0, 1.0, -1.0))
            .with_nodata(Some(-9999.0));
        let sliver = MultiPolygon::new(vec![polygon![
            (x: 10.0, y: 10.0),
            (x: 10.001, y: 10.0),
            (x: 10.001, y: 30.0),
            (x: 10.0, y: 30.0),
        ]]);
        assert_eq!(
            estimate_volume(&dem, &sliver, &VolumeParams::default()),
            SiteEstimate::Unestimable(UnestimableReason::NoElevationData)
        );
    }

    #[test]
    fn test_all_nodata_clip_is_unestimable() {
        let dem = Raster::filled(50, 50, -9999.0)
            .with_transform(GeoTransform::new(0.0, 50.0, 1.0, -1.0))
            .with_nodata(Some(-9999.0));
        let estimate = estimate_volume(&dem, &square(10.0, 10.0, 20.0), &VolumeParams::default());
        assert!(!estimate.is_computed());
    }

    #[test]
    fn test_surface_fallback_policies() {
        // Pit covers the whole raster, so the ring around it is off-grid
        let mut dem = Raster::filled(10, 10, 100.0)
            .with_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        dem.set(5, 5, 90.0).unwrap();
        let site = square(0.0, 0.0, 10.0);

        let fallback = estimate_volume(&dem, &site, &VolumeParams::default());
        let m = fallback.metrics().copied().unwrap();
        assert_relative_eq!(m.original_surface_m, 99.9, epsilon = 1e-9);
        assert_eq!(m.excavated_cell_count, 1);
        assert_relative_eq!(m.max_depth_m, 9.9, epsilon = 1e-9);

        let skip = VolumeParams {
            surface_fallback: SurfaceFallback::Skip,
            ..Default::default()
        };
        assert_eq!(
            estimate_volume(&dem, &site, &skip),
            SiteEstimate::Unestimable(UnestimableReason::NoReferenceSurface)
        );
    }

    #[test]
    fn test_raised_pit_has_zero_depth_statistics() {
        let dem = Raster::filled(100, 100, 150.0)
            .with_transform(GeoTransform::new(0.0, 100.0, 1.0, -1.0));
        let m = estimate_volume(&dem, &square(40.0, 40.0, 20.0), &VolumeParams::default())
            .metrics()
            .copied()
            .unwrap();
        assert_eq!(m.volume_m3, 0.0);
        assert_eq!(m.avg_depth_m, 0.0);
        assert_eq!(m.max_depth_m, 0.0);
    }
}
