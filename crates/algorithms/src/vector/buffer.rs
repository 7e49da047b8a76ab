//! Neighbourhood shapes around a pit footprint
//!
//! The reference surface of a pit is sampled from the terrain inside an
//! outward buffer, either the whole buffered shape or only the ring left
//! after removing the pit itself.

use geo::{BooleanOps, Buffer, MultiPolygon};

/// Expand a footprint outward by `distance` (planar units of its CRS).
///
/// A zero distance returns the footprint unchanged.
pub fn buffer_polygon(geometry: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance == 0.0 {
        return geometry.clone();
    }
    geometry.buffer(distance)
}

/// The band between a footprint and its outward buffer.
pub fn surrounding_ring(geometry: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    buffer_polygon(geometry, distance).difference(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area, Contains, Point};

    fn square(side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: side, y: 0.0),
            (x: side, y: side),
            (x: 0.0, y: side),
        ]])
    }

    #[test]
    fn test_buffer_area_of_square() {
        // 200 m square, 50 m round-cornered buffer: 300² - 4·50² + π·50²
        let buffered = buffer_polygon(&square(200.0), 50.0);
        let expected = 300.0 * 300.0 - 4.0 * 2500.0 + std::f64::consts::PI * 2500.0;
        let error = (buffered.unsigned_area() - expected).abs() / expected;
        assert!(error < 0.005, "buffer area off by {:.3}%", error * 100.0);
    }

    #[test]
    fn test_ring_excludes_the_pit() {
        let ring = surrounding_ring(&square(200.0), 50.0);
        assert!(!ring.contains(&Point::new(100.0, 100.0)));
        assert!(ring.contains(&Point::new(-25.0, 100.0)));

        let buffered = buffer_polygon(&square(200.0), 50.0);
        let diff = buffered.unsigned_area() - ring.unsigned_area();
        assert!((diff - 40_000.0).abs() < 1.0);
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(buffer_polygon(&square(10.0), 0.0), square(10.0));
        assert!(surrounding_ring(&square(10.0), 0.0).unsigned_area() < 1e-9);
    }
}
