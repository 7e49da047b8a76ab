//! Coordinate transforms between two CRS, applied to whole geometries.

use super::{Projection, CRS};
use crate::error::Result;
use geo::{Coord, MapCoords};

/// A resolved source → target coordinate transform.
///
/// Equivalent CRS short-circuit to the identity, so geometries in a CRS we
/// cannot project are still usable as long as nothing asks to move them.
#[derive(Debug, Clone, Copy)]
pub struct CrsTransform {
    steps: Option<(Projection, Projection)>,
}

impl CrsTransform {
    /// Build the transform from `source` to `target`.
    pub fn new(source: &CRS, target: &CRS) -> Result<Self> {
        if source.is_equivalent(target) {
            return Ok(Self::identity());
        }
        let from = Projection::from_crs(source)?;
        let to = Projection::from_crs(target)?;
        if from == to {
            return Ok(Self::identity());
        }
        Ok(Self {
            steps: Some((from, to)),
        })
    }

    /// The no-op transform
    pub fn identity() -> Self {
        Self { steps: None }
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_none()
    }

    /// Transform a single coordinate
    pub fn transform_coord(&self, coord: Coord<f64>) -> Coord<f64> {
        match self.steps {
            None => coord,
            Some((from, to)) => {
                let (lon, lat) = from.inverse(coord.x, coord.y);
                let (x, y) = to.forward(lon, lat);
                Coord { x, y }
            }
        }
    }

    /// Transform every coordinate of a geometry
    pub fn transform<G>(&self, geometry: &G) -> G::Output
    where
        G: MapCoords<f64, f64>,
    {
        geometry.map_coords(|c| self.transform_coord(c))
    }
}
