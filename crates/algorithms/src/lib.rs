//! # pitscan algorithms
//!
//! The excavation compliance engine: classifies detected excavation
//! footprints against an authorized boundary and estimates the volume
//! removed at every unauthorized site from a DEM.
//!
//! ## Modules
//!
//! - **compliance**: reconciliation, overlay, area accounting, volume estimation, reporting
//! - **vector**: geometry repair and buffering
//! - **config**: analysis parameters and policies
//! - **parallel**: per-site fan-out strategies
//!
//! ```ignore
//! use pitscan_algorithms::prelude::*;
//! use pitscan_core::io::read_polygons;
//!
//! let authorized = read_polygons("lease.geojson")?;
//! let detected = read_polygons("detections.geojson")?;
//! let dem = open_dem("dem.tif")?;
//! let report = analyze(&authorized, &detected, &dem, &AnalysisConfig::default())?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod compliance;
pub mod config;
pub mod error;
pub(crate) mod maybe_rayon;
pub mod parallel;
pub mod vector;

pub use compliance::{analyze, open_dem, AnalysisReport};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, FailureReport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::compliance::{
        analyze, analyze_at, open_dem, AnalysisReport, ExcavationSite, SiteEstimate,
        UnestimableReason, VolumeMetrics,
    };
    pub use crate::config::{
        AnalysisConfig, MissingCrsPolicy, ReferenceSurface, SurfaceFallback, UnestimablePolicy,
    };
    pub use crate::error::{AnalysisError, FailureReport};
    pub use crate::parallel::ProcessingMode;
    pub use pitscan_core::prelude::*;
}
