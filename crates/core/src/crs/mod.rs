//! Coordinate Reference System handling

mod projection;
mod transform;

pub use projection::Projection;
pub use transform::CrsTransform;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
        }
    }

    /// Create a CRS from a WKT string.
    ///
    /// The EPSG code is picked up from the outermost `AUTHORITY`/`ID` clause,
    /// or recognised from the name of an ESRI-style `.prj` definition.
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into();
        let epsg = wkt_authority_code(&wkt).or_else(|| esri_name_code(&wkt));
        Self {
            wkt: Some(wkt),
            epsg,
            proj: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// WGS 84 / NSIDC EASE-Grid 2.0 Global (EPSG:6933), a cylindrical equal-area projection
    pub fn world_equal_area() -> Self {
        Self::from_epsg(6933)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Get PROJ string
    pub fn proj(&self) -> Option<&str> {
        self.proj.as_deref()
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        // Comparing definition text is imperfect but the best we can do without PROJ
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.proj, &other.proj) {
            return a == b;
        }

        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }

    /// OGC URN form used by the legacy GeoJSON `crs` member
    pub fn ogc_urn(&self) -> Option<String> {
        self.epsg.map(|code| format!("urn:ogc:def:crs:EPSG::{}", code))
    }
}

impl FromStr for CRS {
    type Err = Error;

    /// Parse `EPSG:n`, OGC URNs (`urn:ogc:def:crs:EPSG::n`, `...OGC:1.3:CRS84`),
    /// bare EPSG numbers, PROJ strings and WKT.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let upper = text.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(Self::wgs84());
        }
        if upper.starts_with("EPSG:") || upper.starts_with("URN:OGC:DEF:CRS:EPSG:") {
            // The code is always the last colon-separated component
            let code = text.rsplit(':').next().unwrap_or_default();
            return code
                .parse::<u32>()
                .map(Self::from_epsg)
                .map_err(|_| Error::UnsupportedCrs(text.to_string()));
        }
        if let Ok(code) = text.parse::<u32>() {
            return Ok(Self::from_epsg(code));
        }
        if text.starts_with("+proj") {
            return Ok(Self::from_proj(text));
        }
        if text.contains('[') {
            return Ok(Self::from_wkt(text));
        }

        Err(Error::UnsupportedCrs(text.to_string()))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// EPSG code of the outermost `AUTHORITY["EPSG","n"]` (WKT1) or `ID["EPSG",n]` (WKT2).
///
/// The CRS-level clause is the last one in the text; nested datum/unit
/// clauses come before it.
fn wkt_authority_code(wkt: &str) -> Option<u32> {
    let upper = wkt.to_ascii_uppercase();
    let start = ["AUTHORITY[\"EPSG\",", "ID[\"EPSG\","]
        .iter()
        .filter_map(|pat| upper.rfind(pat).map(|i| i + pat.len()))
        .max()?;
    let digits: String = upper[start..]
        .chars()
        .skip_while(|c| *c == '"' || c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// EPSG code for the ESRI `.prj` names we can project.
fn esri_name_code(wkt: &str) -> Option<u32> {
    let upper = wkt.to_ascii_uppercase();
    let name_start = upper.find("[\"")? + 2;
    let name_end = name_start + upper[name_start..].find('"')?;
    let name = &upper[name_start..name_end];

    if name == "GCS_WGS_1984" {
        return Some(4326);
    }
    if name.contains("WEB_MERCATOR") {
        return Some(3857);
    }
    if let Some(zone) = name.strip_prefix("WGS_1984_UTM_ZONE_") {
        let (num, hemi) = zone.split_at(zone.len().saturating_sub(1));
        let num: u32 = num.parse().ok()?;
        return match hemi {
            "N" => Some(32600 + num),
            "S" => Some(32700 + num),
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(4326);
        let b = CRS::wgs84();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::web_mercator()));
    }

    #[test]
    fn test_parse_identifiers() {
        assert_eq!("EPSG:32645".parse::<CRS>().unwrap().epsg(), Some(32645));
        assert_eq!("epsg:3857".parse::<CRS>().unwrap().epsg(), Some(3857));
        assert_eq!(
            "urn:ogc:def:crs:EPSG::6933".parse::<CRS>().unwrap().epsg(),
            Some(6933)
        );
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<CRS>().unwrap().epsg(),
            Some(4326)
        );
        assert_eq!("4326".parse::<CRS>().unwrap().epsg(), Some(4326));
        assert!("not a crs".parse::<CRS>().is_err());
    }

    #[test]
    fn test_wkt_outer_authority_wins() {
        let wkt = r#"PROJCS["WGS 84 / UTM zone 45N",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],AUTHORITY["EPSG","4326"]],PROJECTION["Transverse_Mercator"],AUTHORITY["EPSG","32645"]]"#;
        assert_eq!(CRS::from_wkt(wkt).epsg(), Some(32645));
    }

    #[test]
    fn test_esri_prj_names() {
        let utm = r#"PROJCS["WGS_1984_UTM_Zone_45N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984"]]]"#;
        assert_eq!(CRS::from_wkt(utm).epsg(), Some(32645));
        let geo = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]]"#;
        assert_eq!(CRS::from_wkt(geo).epsg(), Some(4326));
    }
}
