use crate::structs::Asset;
use crate::timeline::{Anchor, AnchorTimeline};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an asset without GPS borrows a location from the anchors of its batch.
/// Chosen once per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationMethod {
    /// Closest anchor in time, before or after. Suits discontinuous travel such as flights.
    #[default]
    NearestNeighbor,
    /// Latest anchor at or before the asset: the location persists until the next fix.
    ForwardFill,
}

impl fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NearestNeighbor => write!(f, "nearest-neighbor"),
            Self::ForwardFill => write!(f, "forward-fill"),
        }
    }
}

/// Picks the anchor whose coordinates `orphan` borrows, or `None` when the method finds
/// no candidate. `None` is an "unresolved" outcome, not an error.
pub fn interpolate<'t>(
    orphan: &Asset,
    timeline: &'t AnchorTimeline,
    method: InterpolationMethod,
) -> Option<&'t Anchor> {
    match method {
        InterpolationMethod::NearestNeighbor => timeline.nearest(orphan.capture_instant),
        InterpolationMethod::ForwardFill => timeline.last_before(orphan.capture_instant),
    }
}
