//! # pitscan core
//!
//! Core types and I/O for the pitscan excavation compliance engine.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type, and the `RasterSource` access trait
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`, `Projection`, `CrsTransform`: coordinate reference systems and reprojection
//! - `PolygonSet`: attributed polygon layers
//! - I/O for GeoTIFF, GeoJSON and Shapefile

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::{CrsTransform, Projection, CRS};
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement, RasterSource};
pub use vector::{AttributeValue, PolygonFeature, PolygonSet, Properties};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{CrsTransform, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement, RasterSource};
    pub use crate::vector::{AttributeValue, PolygonFeature, PolygonSet};
}
