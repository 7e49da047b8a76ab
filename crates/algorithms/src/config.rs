//! Analysis configuration and the policy switches for the ambiguous cases

use crate::parallel::ProcessingMode;
use pitscan_core::{Error, Projection, CRS};
use serde::{Deserialize, Serialize};

/// How the pre-excavation surface is sampled around a pit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSurface {
    /// Buffered shape minus the pit footprint: only the terrain around the pit
    #[default]
    SurroundingRing,
    /// Whole buffered shape, pit cells included
    BufferedFootprint,
}

/// What to do when the buffered neighbourhood has no valid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFallback {
    /// Use the mean of the whole DEM
    #[default]
    RasterMean,
    /// Give up on the site
    Skip,
}

/// What to do when exactly one polygon set lacks CRS metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCrsPolicy {
    /// Label the bare set with the other set's CRS, coordinates untouched
    #[default]
    AssumeCounterpart,
    /// Fail with `UndeterminedReferenceFrame`
    Reject,
}

/// Whether unestimable sites appear in `illegal_operations`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnestimablePolicy {
    /// Listed with status `UNESTIMABLE` and a reason
    #[default]
    Flag,
    /// Left out of the listing
    Omit,
}

/// Parameters for an excavation analysis.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// area_crs = "EPSG:32645"
/// buffer_distance = 30.0
/// surface_fallback = "skip"
/// processing = { parallel_with = 4 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Equal-area CRS used for overlay and area accounting
    #[serde(with = "crs_text")]
    pub area_crs: CRS,
    /// Reference-surface buffer, in DEM linear units
    pub buffer_distance: f64,
    pub reference_surface: ReferenceSurface,
    pub surface_fallback: SurfaceFallback,
    pub missing_crs_policy: MissingCrsPolicy,
    pub unestimable_policy: UnestimablePolicy,
    pub processing: ProcessingMode,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            area_crs: CRS::world_equal_area(),
            buffer_distance: 50.0,
            reference_surface: ReferenceSurface::default(),
            surface_fallback: SurfaceFallback::default(),
            missing_crs_policy: MissingCrsPolicy::default(),
            unestimable_policy: UnestimablePolicy::default(),
            processing: ProcessingMode::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reject values no analysis can run with
    pub fn validate(&self) -> Result<(), Error> {
        if !self.buffer_distance.is_finite() || self.buffer_distance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "buffer_distance",
                value: self.buffer_distance.to_string(),
                reason: "must be a finite, non-negative distance".into(),
            });
        }

        if self.processing == ProcessingMode::ParallelWith(0) {
            return Err(Error::InvalidParameter {
                name: "processing",
                value: "parallel_with = 0".into(),
                reason: "thread count must be at least 1".into(),
            });
        }

        let projection = Projection::from_crs(&self.area_crs)?;
        if !projection.is_projected() {
            return Err(Error::InvalidParameter {
                name: "area_crs",
                value: self.area_crs.identifier(),
                reason: "areas need a projected CRS in metres".into(),
            });
        }

        Ok(())
    }
}

/// (De)serialize a CRS as its textual identifier (`"EPSG:6933"`)
mod crs_text {
    use pitscan_core::CRS;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(crs: &CRS, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crs.identifier())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CRS, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
