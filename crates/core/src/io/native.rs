//! Native GeoTIFF reading/writing on top of the `tiff` crate.
//!
//! Georeferencing support covers what DEM exports actually carry:
//! ModelPixelScale + ModelTiepoint (or ModelTransformation), the EPSG code
//! from the GeoKey directory and the GDAL_NODATA ASCII tag.

use crate::crs::{Projection, CRS};
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Read a GeoTIFF file into a Raster
///
/// The file handle is closed before this returns, on success and on error.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    // Multi-band files decode interleaved; only single-band DEMs are accepted
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let nodata = read_nodata(&mut decoder).and_then(|v| num_traits::cast::<f64, T>(v));
    let mut raster = Raster::from_vec(data, rows, cols)?
        .with_crs(read_crs(&mut decoder))
        .with_nodata(nodata);

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    Ok(raster)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint, or ModelTransformation
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
        }
    }

    // Row-major 4x4 matrix; x = m0*col + m1*row + m3, y = m4*col + m5*row + m7
    let m = decoder.get_tag_f64_vec(Tag::ModelTransformationTag).ok()?;
    (m.len() >= 8).then(|| GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]))
}

/// EPSG code from the GeoKey directory
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    let entries: Vec<&[u16]> = keys.get(4..)?.chunks_exact(4).collect();

    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e[0] == id && e[1] == 0)
            .map(|e| e[3])
            .filter(|&code| code != 0 && code != USER_DEFINED)
    };

    lookup(PROJECTED_CS_TYPE)
        .or_else(|| lookup(GEOGRAPHIC_TYPE))
        .map(|code| CRS::from_epsg(code as u32))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse()
        .ok()
}

/// Write a Raster to a GeoTIFF file (32-bit float)
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;

    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys(raster.crs())[..])?;

    if let Some(nodata) = raster.nodata().and_then(|v| v.to_f64()) {
        if !nodata.is_nan() {
            image
                .encoder()
                .write_tag(Tag::GdalNodata, nodata.to_string().as_str())?;
        }
    }

    image.write_data(&data)?;
    Ok(())
}

/// GeoKey directory: version header, model type, raster type, and the EPSG key when known
fn geokeys(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs
        .and_then(|c| c.epsg())
        .and_then(|code| u16::try_from(code).ok());
    let geographic = code
        .and_then(|c| Projection::from_epsg(c as u32))
        .is_some_and(|p| !p.is_projected());

    let mut keys = vec![
        GT_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 },
        GT_RASTER_TYPE, 0, 1, 1, // RasterPixelIsArea
    ];
    if let Some(code) = code {
        let key = if geographic { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    let mut header = vec![1, 1, 0, (keys.len() / 4) as u16];
    header.extend(keys);
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Raster<f64> {
        let mut dem = Raster::filled(4, 5, 150.0)
            .with_transform(GeoTransform::new(420_000.0, 2_627_400.0, 1.0, -1.0))
            .with_crs(Some(CRS::from_epsg(32645)))
            .with_nodata(Some(-9999.0));
        dem.set(1, 2, 120.0).unwrap();
        dem.set(3, 4, -9999.0).unwrap();
        dem
    }

    #[test]
    fn test_buffer_roundtrip_keeps_georeferencing() {
        let bytes = write_geotiff_to_buffer(&sample()).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (4, 5));
        assert_eq!(back.get(1, 2).unwrap(), 120.0);
        assert_eq!(back.transform(), sample().transform());
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32645));
        assert_eq!(back.nodata(), Some(-9999.0));
        assert_eq!(back.value_at(3, 4), None);
    }

    #[test]
    fn test_geographic_geokeys() {
        let keys = geokeys(Some(&CRS::wgs84()));
        assert_eq!(keys[3], 3, "three keys");
        assert!(keys.chunks_exact(4).any(|k| k == [GEOGRAPHIC_TYPE, 0, 1, 4326]));
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(read_geotiff_from_buffer::<f64>(b"not a tiff").is_err());
    }
}
