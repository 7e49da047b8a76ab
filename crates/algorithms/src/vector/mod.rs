//! Vector helpers for the compliance engine
//!
//! - Repair: best-effort fixing of malformed input polygons
//! - Buffer: neighbourhood shapes used to sample the reference surface

mod buffer;
mod repair;

pub use buffer::{buffer_polygon, surrounding_ring};
pub use repair::{repair_geometry, repair_set, Repair};
