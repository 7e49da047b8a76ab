//! Read-only access to an elevation raster: polygon clipping and global statistics

use crate::crs::CRS;
use crate::raster::{GeoTransform, Raster, RasterElement};
use geo::{BoundingRect, Contains, MultiPolygon, Point};

/// The raster operations the excavation engine needs from a DEM.
///
/// Implementations must be shareable across worker threads; every method
/// takes `&self` and must not mutate the underlying grid.
pub trait RasterSource: Sync {
    /// Affine transform of the full grid
    fn transform(&self) -> &GeoTransform;

    /// CRS of the grid, if known
    fn crs(&self) -> Option<&CRS>;

    /// Clip the grid to a polygon.
    ///
    /// The window is cropped to the polygon's bounding box; cells whose
    /// center lies outside the polygon, and source no-data cells, are NaN.
    /// Returns `None` when the polygon does not overlap the grid at all.
    fn clip(&self, geometry: &MultiPolygon<f64>) -> Option<Raster<f64>>;

    /// Mean of every valid cell in the grid
    fn mean(&self) -> Option<f64>;
}

impl<T: RasterElement> RasterSource for Raster<T> {
    fn transform(&self) -> &GeoTransform {
        Raster::transform(self)
    }

    fn crs(&self) -> Option<&CRS> {
        Raster::crs(self)
    }

    fn clip(&self, geometry: &MultiPolygon<f64>) -> Option<Raster<f64>> {
        clip_to_polygon(self, geometry)
    }

    fn mean(&self) -> Option<f64> {
        self.statistics().mean
    }
}

/// Half-open pixel window `[start, end)` on one axis
fn axis_window(lo: f64, hi: f64, len: usize) -> Option<(usize, usize)> {
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    let start = lo.floor().max(0.0);
    let end = hi.ceil().min(len as f64);
    if end <= start {
        return None;
    }
    Some((start as usize, end as usize))
}

/// Mask a raster to a polygon, cropping to the polygon's extent.
pub fn clip_to_polygon<T: RasterElement>(
    raster: &Raster<T>,
    geometry: &MultiPolygon<f64>,
) -> Option<Raster<f64>> {
    let rect = geometry.bounding_rect()?;
    let gt = raster.transform();
    let (rows, cols) = raster.shape();

    let (min, max) = (rect.min(), rect.max());
    let (c0, c1, r0, r1) = [
        (min.x, min.y),
        (min.x, max.y),
        (max.x, min.y),
        (max.x, max.y),
    ]
    .iter()
    .map(|&(x, y)| gt.geo_to_pixel(x, y))
    .fold(
        (f64::MAX, f64::MIN, f64::MAX, f64::MIN),
        |(c0, c1, r0, r1), (c, r)| (c0.min(c), c1.max(c), r0.min(r), r1.max(r)),
    );

    let (col_start, col_end) = axis_window(c0, c1, cols)?;
    let (row_start, row_end) = axis_window(r0, r1, rows)?;
    let (w_rows, w_cols) = (row_end - row_start, col_end - col_start);

    let mut data = Vec::with_capacity(w_rows * w_cols);
    for row in row_start..row_end {
        for col in col_start..col_end {
            let (x, y) = gt.pixel_to_geo(col, row);
            let value = if geometry.contains(&Point::new(x, y)) {
                raster.value_at(row, col).unwrap_or(f64::NAN)
            } else {
                f64::NAN
            };
            data.push(value);
        }
    }

    let clipped = Raster::from_vec(data, w_rows, w_cols)
        .ok()?
        .with_transform(gt.window(col_start, row_start))
        .with_crs(raster.crs().cloned())
        .with_nodata(Some(f64::NAN));
    Some(clipped)
}
