use super::ZoneLookup;
use super::error::DatasetLoadError;
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Value as GeometryValue};
use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};
use std::path::Path;
use tracing::{debug, info};

/// Bounding box of a boundary, tagged with the boundary's position in dataset order.
type Extent = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// A named timezone area. Coordinates are stored as `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    zone_id: String,
    shape: MultiPolygon<f64>,
}

impl Boundary {
    pub fn new(zone_id: impl Into<String>, shape: MultiPolygon<f64>) -> Self {
        Self {
            zone_id: zone_id.into(),
            shape,
        }
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// Points on the boundary line count as contained.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        let coord = Coord {
            x: longitude,
            y: latitude,
        };
        self.shape.coordinate_position(&coord) != CoordPos::Outside
    }
}

/// Timezone polygons with an R-tree over their bounding boxes.
///
/// Queries first collect the boundaries whose bounding box covers the point, then run
/// the exact point-in-polygon test on those candidates only. When several boundaries
/// contain the point (shared borders), the one that comes first in the dataset wins.
#[derive(Debug)]
pub struct BoundaryIndex {
    boundaries: Vec<Boundary>,
    tree: RTree<Extent>,
}

impl BoundaryIndex {
    /// Loads a GeoJSON `FeatureCollection` whose features carry a `tzid` property,
    /// the layout used by timezone-boundary-builder releases.
    pub fn from_path(path: &Path) -> Result<Self, DatasetLoadError> {
        let raw = std::fs::read_to_string(path)?;
        let index = Self::from_geojson_str(&raw)?;
        info!(
            path = %path.display(),
            boundaries = index.len(),
            "Loaded timezone boundary dataset"
        );
        Ok(index)
    }

    pub fn from_geojson_str(raw: &str) -> Result<Self, DatasetLoadError> {
        let GeoJson::FeatureCollection(collection) = raw.parse::<GeoJson>()? else {
            return Err(DatasetLoadError::NotAFeatureCollection);
        };

        let mut boundaries = Vec::with_capacity(collection.features.len());
        for (feature_idx, feature) in collection.features.iter().enumerate() {
            let zone_id = feature
                .property("tzid")
                .and_then(|value| value.as_str())
                .ok_or(DatasetLoadError::MissingZoneId {
                    feature: feature_idx,
                })?;
            let shape = match feature.geometry.as_ref().map(|geometry| &geometry.value) {
                Some(GeometryValue::Polygon(rings)) => {
                    polygon_from_rings(rings).map(|polygon| MultiPolygon::new(vec![polygon]))
                }
                Some(GeometryValue::MultiPolygon(polygons)) => polygons
                    .iter()
                    .map(|rings| polygon_from_rings(rings))
                    .collect::<Option<Vec<_>>>()
                    .map(MultiPolygon::new),
                _ => {
                    return Err(DatasetLoadError::UnsupportedGeometry {
                        zone_id: zone_id.to_string(),
                    });
                }
            };
            let shape = shape.ok_or_else(|| DatasetLoadError::InvalidPolygon {
                zone_id: zone_id.to_string(),
            })?;
            boundaries.push(Boundary::new(zone_id, shape));
        }

        Self::from_boundaries(boundaries)
    }

    /// Builds the index from boundaries already in priority order.
    pub fn from_boundaries(boundaries: Vec<Boundary>) -> Result<Self, DatasetLoadError> {
        if boundaries.is_empty() {
            return Err(DatasetLoadError::Empty);
        }

        let extents = boundaries
            .iter()
            .enumerate()
            .map(|(idx, boundary)| {
                let rect = boundary.shape.bounding_rect().ok_or_else(|| {
                    DatasetLoadError::InvalidPolygon {
                        zone_id: boundary.zone_id.clone(),
                    }
                })?;
                let (min, max) = (rect.min(), rect.max());
                Ok(GeomWithData::new(
                    Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                    idx,
                ))
            })
            .collect::<Result<Vec<Extent>, DatasetLoadError>>()?;

        debug!(boundaries = boundaries.len(), "Built boundary R-tree");
        Ok(Self {
            boundaries,
            tree: RTree::bulk_load(extents),
        })
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn resolve(&self, latitude: f64, longitude: f64) -> Option<&str> {
        self.tree
            .locate_all_at_point(&[longitude, latitude])
            .map(|extent| extent.data)
            .filter(|&idx| self.boundaries[idx].contains(latitude, longitude))
            .min()
            .map(|idx| self.boundaries[idx].zone_id())
    }
}

impl ZoneLookup for BoundaryIndex {
    fn lookup(&self, latitude: f64, longitude: f64) -> Option<&str> {
        self.resolve(latitude, longitude)
    }
}

/// First ring is the exterior, the rest are holes.
fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| ring_from_positions(ring));
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn ring_from_positions(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    if positions.len() < 3 {
        return None;
    }
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::from)
}
