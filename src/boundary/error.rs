use thiserror::Error;

/// Failure to load the timezone boundary dataset. Fatal for a run.
#[derive(Error, Debug)]
pub enum DatasetLoadError {
    #[error("Could not read boundary dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Boundary dataset is not valid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    #[error("Boundary dataset must be a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    #[error("Feature #{feature} has no \"tzid\" property")]
    MissingZoneId { feature: usize },

    #[error("Boundary {zone_id} has no Polygon or MultiPolygon geometry")]
    UnsupportedGeometry { zone_id: String },

    #[error("Boundary {zone_id} contains a degenerate ring")]
    InvalidPolygon { zone_id: String },

    #[error("Boundary dataset contains no polygons")]
    Empty,
}
