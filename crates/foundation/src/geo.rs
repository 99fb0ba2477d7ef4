/// Geographic coordinate in degrees (WGS84 latitude / longitude).
///
/// This is the unit the globe camera is pointed with; altitude is a camera
/// concern and lives with the renderer settings, not here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` if both components are finite and inside the WGS84 ranges
    /// (`lat ∈ [-90, 90]`, `lng ∈ [-180, 180]`).
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}
