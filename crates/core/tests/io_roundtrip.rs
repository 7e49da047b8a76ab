//! On-disk round trips for the raster and vector readers/writers.

use approx::assert_relative_eq;
use geo::{polygon, Area};
use pitscan_core::io::{read_geotiff, read_polygons, write_geojson, write_geotiff};
use pitscan_core::{AttributeValue, GeoTransform, PolygonFeature, PolygonSet, Raster, CRS};
use std::fs;

fn dem() -> Raster<f32> {
    let mut dem = Raster::filled(30, 20, 150.0_f32)
        .with_transform(GeoTransform::new(503_000.0, 3_000_400.0, 2.0, -2.0))
        .with_crs(Some(CRS::from_epsg(32645)))
        .with_nodata(Some(-9999.0));
    dem.set(5, 5, 121.5).unwrap();
    dem.set(0, 19, -9999.0).unwrap();
    dem
}

#[test]
fn geotiff_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem.tif");
    write_geotiff(&dem(), &path).unwrap();

    let back: Raster<f64> = read_geotiff(&path).unwrap();
    assert_eq!(back.shape(), (30, 20));
    assert_eq!(back.get(5, 5).unwrap(), 121.5);
    assert_eq!(back.value_at(0, 19), None);
    assert_relative_eq!(back.cell_area(), 4.0);
    assert_eq!(back.bounds(), (503_000.0, 3_000_340.0, 503_040.0, 3_000_400.0));
    assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32645));

    let stats = back.statistics();
    assert_eq!(stats.valid_count, 599);
    assert_eq!(stats.max, Some(150.0));
}

#[test]
fn geographic_geotiff_keeps_its_crs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem_4326.tif");
    let dem = Raster::filled(4, 4, 10.0_f64)
        .with_transform(GeoTransform::new(87.0, 27.1, 0.001, -0.001))
        .with_crs(Some(CRS::wgs84()));
    write_geotiff(&dem, &path).unwrap();

    let back: Raster<f64> = read_geotiff(&path).unwrap();
    assert_eq!(back.crs().and_then(|c| c.epsg()), Some(4326));
    assert_relative_eq!(back.transform().pixel_width, 0.001);
}

#[test]
fn geojson_layer_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lease.geojson");

    let set = PolygonSet::from_features(
        vec![PolygonFeature::from_polygon(polygon![
            (x: 0.0, y: 0.0), (x: 2000.0, y: 0.0), (x: 2000.0, y: 2000.0), (x: 0.0, y: 2000.0),
        ])
        .with_property("lease_id", AttributeValue::String("ML-2291".into()))
        .with_property("active", AttributeValue::Bool(true))],
        Some(CRS::from_epsg(32645)),
    );
    write_geojson(&set, &path).unwrap();

    let back = read_polygons(&path).unwrap();
    assert_eq!(back.crs.as_ref().and_then(|c| c.epsg()), Some(32645));
    assert_eq!(back.len(), 1);
    assert_eq!(back.features[0].properties, set.features[0].properties);
    assert_relative_eq!(back.features[0].geometry.unsigned_area(), 4_000_000.0);
}

#[test]
fn shapefile_without_shp_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("boundary.shp");
    assert!(read_polygons(&missing).is_err());
}

#[test]
fn prj_sidecar_text_resolves_to_epsg() {
    // What a QGIS export of EPSG:32645 writes next to the .shp
    let wkt = r#"PROJCS["WGS_1984_UTM_Zone_45N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",87.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;
    let dir = tempfile::tempdir().unwrap();
    let prj = dir.path().join("boundary.prj");
    fs::write(&prj, wkt).unwrap();

    let crs = CRS::from_wkt(fs::read_to_string(&prj).unwrap());
    assert_eq!(crs.epsg(), Some(32645));
}
