//! Fixtures shared by unit tests across modules.
use crate::boundary::BoundaryIndex;
use crate::structs::{Asset, Coordinates};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

/// An axis-aligned rectangle feature, given as (west, south, east, north).
pub fn square_feature(zone_id: &str, west: f64, south: f64, east: f64, north: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": { "tzid": zone_id },
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [west, south], [east, south], [east, north], [west, north], [west, south]
            ]]
        }
    })
}

/// Rough boxes around Japan, the Netherlands and the US east coast. Everything else is ocean.
pub fn synthetic_index() -> BoundaryIndex {
    let raw = json!({
        "type": "FeatureCollection",
        "features": [
            square_feature("Asia/Tokyo", 129.0, 30.0, 146.0, 46.0),
            square_feature("Europe/Amsterdam", 3.3, 50.7, 7.3, 53.6),
            square_feature("America/New_York", -80.0, 35.0, -70.0, 45.0),
        ]
    })
    .to_string();
    BoundaryIndex::from_geojson_str(&raw).expect("synthetic dataset is valid")
}

pub fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid RFC 3339 fixture")
        .with_timezone(&Utc)
}

pub fn asset(id: &str, capture: &str, coordinates: Option<(f64, f64)>) -> Asset {
    Asset::new(
        id,
        utc(capture),
        coordinates.map(|(lat, lon)| Coordinates::new(lat, lon)),
    )
}
