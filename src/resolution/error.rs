use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Per-asset failure. Recorded on the asset's result; the batch keeps going.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ResolutionError {
    #[error("Malformed coordinates ({latitude}, {longitude})")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Unknown timezone identifier: {0}")]
    UnknownZone(String),

    #[error("Offset lookup for {zone_id} at {instant} does not round-trip")]
    OffsetLookup {
        zone_id: String,
        instant: DateTime<Utc>,
    },
}
