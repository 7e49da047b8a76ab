//! Request-level failures of an excavation analysis

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a whole analysis.
///
/// Per-site problems never surface here; they become
/// [`SiteEstimate::Unestimable`](crate::compliance::SiteEstimate) entries in
/// the report instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Neither polygon set (or, under the strict policy, one of them) carries CRS metadata
    #[error("undetermined reference frame: {0}")]
    UndeterminedReferenceFrame(String),

    #[error("cannot read elevation raster '{path}': {reason}")]
    UnreadableRaster { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[source] pitscan_core::Error),

    #[error("reprojection failed: {0}")]
    Reprojection(#[from] pitscan_core::Error),

    #[error("overlay failed: {0}")]
    Overlay(String),
}

impl AnalysisError {
    /// Stable machine-readable code for this failure
    pub fn error_code(&self) -> &'static str {
        match self {
            AnalysisError::UndeterminedReferenceFrame(_) => "UNDETERMINED_REFERENCE_FRAME",
            AnalysisError::UnreadableRaster { .. } => "UNREADABLE_RASTER",
            AnalysisError::InvalidConfig(_) => "INVALID_CONFIG",
            AnalysisError::Reprojection(_) => "REPROJECTION_FAILED",
            AnalysisError::Overlay(_) => "OVERLAY_FAILED",
        }
    }

    /// Structured failure payload returned in place of a report
    pub fn to_failure(&self) -> FailureReport {
        FailureReport {
            status: "FAILED",
            error_code: self.error_code(),
            error: self.to_string(),
        }
    }
}

/// `{status: "FAILED", error_code, error}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReport {
    pub status: &'static str,
    pub error_code: &'static str,
    pub error: String,
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_report_shape() {
        let err = AnalysisError::UndeterminedReferenceFrame(
            "neither polygon set declares a CRS".into(),
        );
        let json = serde_json::to_value(err.to_failure()).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["error_code"], "UNDETERMINED_REFERENCE_FRAME");
        assert!(json["error"].as_str().unwrap().contains("neither polygon set"));
    }

    #[test]
    fn test_core_errors_map_to_reprojection() {
        let err: AnalysisError =
            pitscan_core::Error::UnsupportedCrs("EPSG:2154".into()).into();
        assert_eq!(err.error_code(), "REPROJECTION_FAILED");
    }
}
