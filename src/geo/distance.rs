use super::Position;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two points.
pub fn haversine_km(a: Position, b: Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    // abs() keeps the result bit-for-bit symmetric in argument order
    let d_lat = (b.latitude - a.latitude).abs().to_radians();
    let d_lon = (b.longitude - a.longitude).abs().to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h past 1 for near-antipodal points
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// "850 m" below one kilometre, "3.2 km" above.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.1} km")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DHAKA: Position = Position {
        latitude: 23.8103,
        longitude: 90.4125,
    };
    const CHITTAGONG: Position = Position {
        latitude: 22.3569,
        longitude: 91.7832,
    };

    #[test]
    fn zero_for_identical_points() {
        assert_eq!(haversine_km(DHAKA, DHAKA), 0.0);
    }

    #[test]
    fn symmetric() {
        let samples = [
            (DHAKA, CHITTAGONG),
            (Position::new(-33.86, 151.21), Position::new(51.5, -0.12)),
            (Position::new(89.9, 0.0), Position::new(-89.9, 179.9)),
            (Position::new(0.0, -179.5), Position::new(0.0, 179.5)),
        ];
        for (a, b) in samples {
            assert_eq!(haversine_km(a, b), haversine_km(b, a));
        }
    }

    #[test]
    fn dhaka_to_chittagong_is_about_215_km() {
        let d = haversine_km(DHAKA, CHITTAGONG);
        assert!((d - 215.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn antimeridian_is_short() {
        let d = haversine_km(Position::new(0.0, -179.5), Position::new(0.0, 179.5));
        assert!(d < 112.0, "got {d}");
    }

    #[test]
    fn near_antipodal_pairs_are_finite_and_symmetric() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        for step in 0..9000 {
            let lat = -90.0 + step as f64 * 0.02;
            let a = Position::new(lat, 10.0);
            let b = Position::new(-lat, -170.0);
            let d = haversine_km(a, b);
            assert!(d.is_finite(), "NaN at lat {lat}");
            assert!(d <= half_circumference + 1e-6, "got {d} at lat {lat}");
            assert_eq!(d, haversine_km(b, a));
        }
    }

    #[test]
    fn formats_metres_and_kilometres() {
        assert_eq!(format_distance(0.85), "850 m");
        assert_eq!(format_distance(3.24), "3.2 km");
        assert_eq!(format_distance(1.0), "1.0 km");
    }
}
