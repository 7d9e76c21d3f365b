//! Coordinate definition and great-circle distance

use geo::geometry::Point;
use serde::{Deserialize, Serialize};

/// Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Position on the globe, in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and inside the lat/lng ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<Coordinate> for Point {
    fn from(c: Coordinate) -> Self {
        Point::new(c.longitude, c.latitude)
    }
}

impl From<Point> for Coordinate {
    fn from(p: Point) -> Self {
        Coordinate::new(p.y(), p.x())
    }
}

/// Haversine distance between two coordinates, in kilometers
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // rounding can push h slightly past 1 near antipodes
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn same_point() {
        let p = Coordinate::new(-6.9175, 107.6191);
        assert_eq!(0.0, distance(p, p));
    }

    #[test]
    fn bandung_short_ride() {
        let start = Coordinate::new(-6.9175, 107.6191);
        let dest = Coordinate::new(-6.9024, 107.6186);

        let d = distance(start, dest);
        assert!((d - 1.68).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn antipodes() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);

        let d = distance(a, b);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn point_conversion() {
        let c = Coordinate::new(-26.31832, -48.8702222);
        let p: Point = c.into();
        assert_eq!(Point::new(-48.8702222, -26.31832), p);
        assert_eq!(c, Coordinate::from(p));
    }

    #[test]
    fn validity() {
        assert!(Coordinate::new(90.0, -180.0).is_valid());
        assert!(!Coordinate::new(90.1, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    fn coordinate() -> impl Strategy<Value = Coordinate> {
        (-90.0f64..=90.0, -180.0f64..=180.0).prop_map(|(lat, lng)| Coordinate::new(lat, lng))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_zero_on_itself(a in coordinate()) {
            prop_assert_eq!(0.0, distance(a, a));
        }

        #[test]
        fn prop_symmetric(a in coordinate(), b in coordinate()) {
            prop_assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
        }

        #[test]
        fn prop_bounded(a in coordinate(), b in coordinate()) {
            let d = distance(a, b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }
    }
}
