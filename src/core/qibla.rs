use serde::Serialize;
use thiserror::Error;


// Below this both bearing components are treated as zero (source == target).
const DEGENERATE_EPS: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("coordinate out of range: lat={lat}, lng={lng}")]
    CoordinateOutOfRange { lat: f64, lng: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// The Kaaba in Mecca, target of every Qibla bearing.
pub const KAABA: GeoPoint = GeoPoint {
    latitude: 21.4225,
    longitude: 39.8262,
};

impl GeoPoint {
    /// Builds a point after checking it lies on the globe.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if !(lat_ok && lng_ok) {
            return Err(GeoError::CoordinateOutOfRange {
                lat: latitude,
                lng: longitude,
            });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn qibla_bearing(&self) -> u16 {
        compute_qibla_bearing(self.latitude, self.longitude)
    }
}

/// Initial great-circle bearing from (`lat`, `lng`) towards the Kaaba, in whole
/// degrees clockwise from true north, always in `0..360`.
///
/// Standing on the Kaaba itself has no defined direction; that case yields 0.
pub fn compute_qibla_bearing(lat: f64, lng: f64) -> u16 {
    let lat_rad = lat.to_radians();
    let target_lat_rad = KAABA.latitude.to_radians();
    let d_lng = KAABA.longitude.to_radians() - lng.to_radians();

    let y = d_lng.sin() * target_lat_rad.cos();
    let x = lat_rad.cos() * target_lat_rad.sin()
        - lat_rad.sin() * target_lat_rad.cos() * d_lng.cos();

    if y.abs() < DEGENERATE_EPS && x.abs() < DEGENERATE_EPS {
        return 0;
    }

    let bearing_deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    // 359.5..360 rounds up to 360, which is north again.
    (bearing_deg.round() as u16) % 360
}
