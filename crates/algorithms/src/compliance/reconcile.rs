//! CRS reconciliation between the authorized boundary and the detections

use crate::config::MissingCrsPolicy;
use crate::error::{AnalysisError, Result};
use pitscan_core::{PolygonSet, CRS};
use tracing::{debug, warn};

/// Both polygon sets expressed in one CRS
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub authorized: PolygonSet,
    pub detected: PolygonSet,
    /// The shared CRS; also the CRS of everything handed back to the caller
    pub crs: CRS,
}

/// Bring `authorized` and `detected` into one CRS.
///
/// The authorized boundary is the reference frame: when both sets declare a
/// CRS and they differ, the detections are reprojected. When only one set
/// declares a CRS, `policy` decides whether the other is assumed to share
/// it (a relabel, coordinates untouched) or the request is rejected.
pub fn reconcile(
    authorized: &PolygonSet,
    detected: &PolygonSet,
    policy: MissingCrsPolicy,
) -> Result<Reconciled> {
    match (&authorized.crs, &detected.crs) {
        (None, None) => Err(AnalysisError::UndeterminedReferenceFrame(
            "neither the authorized boundary nor the detections declare a CRS".into(),
        )),

        (None, Some(crs)) => {
            let crs = assume(policy, "authorized boundary", "detections", crs)?;
            Ok(Reconciled {
                authorized: authorized.clone().with_crs(Some(crs.clone())),
                detected: detected.clone(),
                crs,
            })
        }

        (Some(crs), None) => {
            let crs = assume(policy, "detections", "authorized boundary", crs)?;
            Ok(Reconciled {
                authorized: authorized.clone(),
                detected: detected.clone().with_crs(Some(crs.clone())),
                crs,
            })
        }

        (Some(reference), Some(other)) if reference.is_equivalent(other) => {
            debug!("both polygon sets already in {}", reference);
            Ok(Reconciled {
                authorized: authorized.clone(),
                detected: detected.clone(),
                crs: reference.clone(),
            })
        }

        (Some(reference), Some(other)) => {
            debug!("reprojecting detections from {} to {}", other, reference);
            Ok(Reconciled {
                authorized: authorized.clone(),
                detected: detected.reprojected(reference)?,
                crs: reference.clone(),
            })
        }
    }
}

fn assume(policy: MissingCrsPolicy, bare: &str, source: &str, crs: &CRS) -> Result<CRS> {
    match policy {
        MissingCrsPolicy::AssumeCounterpart => {
            warn!(
                "{} has no CRS; assuming it shares {} of the {} (coordinates not transformed)",
                bare, crs, source
            );
            Ok(crs.clone())
        }
        MissingCrsPolicy::Reject => Err(AnalysisError::UndeterminedReferenceFrame(format!(
            "{} has no CRS and assuming one is disabled",
            bare
        ))),
    }
}
