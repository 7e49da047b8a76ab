//! Pure-Rust map projections on the WGS84 ellipsoid (Snyder 1987, USGS formulas).
//!
//! Every supported CRS is expressed as a forward/inverse pair against
//! geographic WGS84 longitude/latitude in degrees. No libproj dependency.

use super::CRS;
use crate::error::{Error, Result};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0_UTM: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Web Mercator latitude limit (degrees)
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// A supported projection, parameterised from an EPSG code.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Longitude/latitude in degrees (EPSG:4326, OGC:CRS84)
    Geographic,
    /// Spherical web mercator (EPSG:3857)
    WebMercator,
    /// Universal Transverse Mercator (EPSG:326xx / 327xx)
    Utm { zone: u32, north: bool },
    /// Lambert cylindrical equal-area on the ellipsoid
    /// (EPSG:6933 with a 30° standard parallel, ESRI:54034 with 0°)
    CylindricalEqualArea { standard_parallel: f64 },
}

impl Projection {
    /// Resolve the projection for a CRS.
    pub fn from_crs(crs: &CRS) -> Result<Self> {
        let code = crs
            .epsg()
            .ok_or_else(|| Error::UnsupportedCrs(crs.identifier()))?;
        Self::from_epsg(code).ok_or_else(|| Error::UnsupportedCrs(crs.identifier()))
    }

    /// Resolve the projection for an EPSG code, `None` if unsupported.
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Projection::Geographic),
            3857 | 900_913 => Some(Projection::WebMercator),
            6933 => Some(Projection::CylindricalEqualArea {
                standard_parallel: 30.0,
            }),
            54034 => Some(Projection::CylindricalEqualArea {
                standard_parallel: 0.0,
            }),
            _ => parse_utm_epsg(code).map(|(zone, north)| Projection::Utm { zone, north }),
        }
    }

    /// Whether coordinates are linear (metres) rather than angular
    pub fn is_projected(&self) -> bool {
        !matches!(self, Projection::Geographic)
    }

    /// Geographic (lon, lat) in degrees → projected (x, y)
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match *self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => mercator_forward(lon, lat),
            Projection::Utm { zone, north } => wgs84_to_utm(lon, lat, zone, north),
            Projection::CylindricalEqualArea { standard_parallel } => {
                cea_forward(lon, lat, standard_parallel)
            }
        }
    }

    /// Projected (x, y) → geographic (lon, lat) in degrees
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            Projection::Geographic => (x, y),
            Projection::WebMercator => mercator_inverse(x, y),
            Projection::Utm { zone, north } => utm_to_wgs84(x, y, zone, north),
            Projection::CylindricalEqualArea { standard_parallel } => {
                cea_inverse(x, y, standard_parallel)
            }
        }
    }
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

// ── Web Mercator ─────────────────────────────────────────────────────────

fn mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
    let x = A * lon.to_radians();
    let y = A * (FRAC_PI_4 + lat / 2.0).tan().ln();
    (x, y)
}

fn mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / A).to_degrees();
    let lat = (2.0 * (y / A).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

// ── Transverse Mercator (Snyder pp. 61-64) ───────────────────────────────

fn central_meridian(zone: u32) -> f64 {
    ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
}

/// WGS84 (lon, lat) in degrees → UTM (easting, northing) in metres.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = central_meridian(zone);

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Snyder eq. 8-9
    let easting = K0_UTM
        * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
        + FALSE_EASTING;

    // Snyder eq. 8-10
    let northing = K0_UTM
        * (m + n
            * tan_lat
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// UTM (easting, northing) in metres → WGS84 (lon, lat) in degrees.
fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };

    let e4 = E2 * E2;
    let e6 = e4 * E2;

    // Footpoint latitude (Snyder eqs. 7-19, 3-24, 3-26)
    let m = y / K0_UTM;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();

    let c1 = E_PRIME2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - E2 * sin1 * sin1;
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - E2) / (w * w.sqrt());
    let d = x / (n1 * K0_UTM);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d2 * d2;
    let d5 = d4 * d;
    let d6 = d4 * d2;

    // Snyder eqs. 8-17, 8-18
    let lat = phi1
        - (n1 * tan1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d6
                    / 720.0);

    let lon = central_meridian(zone)
        + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d5
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}

/// Meridional arc from equator to latitude `lat` (radians). Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Cylindrical equal-area, ellipsoidal (Snyder pp. 81-85) ───────────────

fn cea_k0(standard_parallel: f64) -> f64 {
    let s = standard_parallel.to_radians().sin();
    standard_parallel.to_radians().cos() / (1.0 - E2 * s * s).sqrt()
}

/// Authalic q function (Snyder eq. 3-12)
fn authalic_q(lat: f64) -> f64 {
    let e = E2.sqrt();
    let s = lat.sin();
    (1.0 - E2) * (s / (1.0 - E2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}

fn cea_forward(lon: f64, lat: f64, standard_parallel: f64) -> (f64, f64) {
    let k0 = cea_k0(standard_parallel);
    let x = A * k0 * lon.to_radians();
    let y = A * authalic_q(lat.to_radians()) / (2.0 * k0);
    (x, y)
}

fn cea_inverse(x: f64, y: f64, standard_parallel: f64) -> (f64, f64) {
    let k0 = cea_k0(standard_parallel);
    let qp = authalic_q(FRAC_PI_2);
    let q = (2.0 * y * k0 / A).clamp(-qp, qp);
    let lon = x / (A * k0);

    (lon.to_degrees(), latitude_from_q(q, qp).to_degrees())
}

/// Invert the authalic q function by Newton iteration (Snyder eq. 3-16)
fn latitude_from_q(q: f64, qp: f64) -> f64 {
    if (qp - q.abs()) < 1e-15 {
        return FRAC_PI_2.copysign(q);
    }
    let e = E2.sqrt();
    let mut lat = (q / 2.0).asin();
    for _ in 0..16 {
        let s = lat.sin();
        let w = 1.0 - E2 * s * s;
        let delta = w * w / (2.0 * lat.cos())
            * (q / (1.0 - E2) - s / w + (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln());
        lat += delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    lat
}
