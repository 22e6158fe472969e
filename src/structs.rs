use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components are finite and within the WGS84 value range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A photo or video as it is stored in the asset library.
///
/// `capture_instant` is the single source of truth for *when* the asset was captured.
/// The stored local time and timezone are what the library currently displays, and
/// may be wrong or missing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub capture_instant: DateTime<Utc>,
    pub coordinates: Option<Coordinates>,
    pub filename: String,
    pub current_local_time: Option<String>,
    pub current_zone_id: Option<String>,
}

impl Asset {
    pub fn new(
        id: impl Into<String>,
        capture_instant: DateTime<Utc>,
        coordinates: Option<Coordinates>,
    ) -> Self {
        let id = id.into();
        Self {
            filename: id.clone(),
            id,
            capture_instant,
            coordinates,
            current_local_time: None,
            current_zone_id: None,
        }
    }
}
