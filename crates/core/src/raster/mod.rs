//! Raster data structures and operations

mod element;
mod geotransform;
mod grid;
mod source;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use source::{clip_to_polygon, RasterSource};
