//! I/O for the engine's inputs: GeoTIFF elevation rasters and polygon layers

mod native;
mod vector;

pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
pub use vector::{read_geojson, read_polygons, read_shapefile, write_geojson};
