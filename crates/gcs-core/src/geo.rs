//! Great-circle math for mission navigation and home-distance tracking.

use crate::models::Coordinates;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (Haversine).
///
/// Always finite and non-negative; zero when both points coincide.
pub fn distance(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `from` toward `to`, degrees clockwise from north in [0, 360).
///
/// Returns 0 when the points coincide (the atan2 formula degenerates to 0/0
/// there; by convention we report due north rather than NaN).
pub fn bearing(from: Coordinates, to: Coordinates) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dlambda = (to.lng - from.lng).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    if y == 0.0 && x == 0.0 {
        return 0.0;
    }

    y.atan2(x).to_degrees().rem_euclid(360.0)
}
