//! Chronologically sorted anchors (assets with a GPS fix) of one batch.

use crate::structs::{Asset, Coordinates};
use chrono::{DateTime, Utc};

/// An asset with valid coordinates, used as geographic truth for its neighbours in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub asset_id: String,
    pub capture_instant: DateTime<Utc>,
    pub coordinates: Coordinates,
}

impl Anchor {
    pub fn from_asset(asset: &Asset) -> Option<Self> {
        let coordinates = asset.coordinates.filter(Coordinates::is_valid)?;
        Some(Self {
            asset_id: asset.id.clone(),
            capture_instant: asset.capture_instant,
            coordinates,
        })
    }
}

/// Anchors sorted by capture instant. Anchors sharing an instant keep input order,
/// and whenever such a group is selected its first member is returned.
#[derive(Debug, Clone, Default)]
pub struct AnchorTimeline {
    anchors: Vec<Anchor>,
}

impl AnchorTimeline {
    pub fn build<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> Self {
        let mut anchors: Vec<Anchor> = assets.into_iter().filter_map(Anchor::from_asset).collect();
        // `sort_by_key` is stable.
        anchors.sort_by_key(|anchor| anchor.capture_instant);
        Self { anchors }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// The anchor closest in time to `instant`, looking both backwards and forwards.
    /// An exact tie between an earlier and a later anchor goes to the earlier one.
    pub fn nearest(&self, instant: DateTime<Utc>) -> Option<&Anchor> {
        let split = self
            .anchors
            .partition_point(|anchor| anchor.capture_instant < instant);
        let later = self.anchors.get(split);
        let earlier = split
            .checked_sub(1)
            .map(|idx| self.first_at(self.anchors[idx].capture_instant));

        match (earlier, later) {
            (Some(earlier), Some(later)) => {
                let back = instant.signed_duration_since(earlier.capture_instant);
                let ahead = later.capture_instant.signed_duration_since(instant);
                if ahead < back {
                    Some(later)
                } else {
                    Some(earlier)
                }
            }
            (earlier, later) => earlier.or(later),
        }
    }

    /// The latest anchor captured at or before `instant`. Never looks into the future.
    pub fn last_before(&self, instant: DateTime<Utc>) -> Option<&Anchor> {
        let split = self
            .anchors
            .partition_point(|anchor| anchor.capture_instant <= instant);
        let idx = split.checked_sub(1)?;
        Some(self.first_at(self.anchors[idx].capture_instant))
    }

    /// First anchor, in input order, captured exactly at `instant`. The caller
    /// guarantees at least one exists.
    fn first_at(&self, instant: DateTime<Utc>) -> &Anchor {
        let idx = self
            .anchors
            .partition_point(|anchor| anchor.capture_instant < instant);
        &self.anchors[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{asset, utc};

    fn timeline(assets: &[Asset]) -> AnchorTimeline {
        AnchorTimeline::build(assets)
    }

    #[test]
    fn test_build_sorts_and_skips_assets_without_valid_gps() {
        let assets = [
            asset("late", "2024-06-01T12:00:00Z", Some((35.0, 139.0))),
            asset("orphan", "2024-06-01T09:00:00Z", None),
            asset("corrupt", "2024-06-01T08:00:00Z", Some((999.0, 139.0))),
            asset("early", "2024-06-01T10:00:00Z", Some((35.0, 139.0))),
        ];
        let timeline = timeline(&assets);
        let ids: Vec<&str> = timeline
            .anchors()
            .iter()
            .map(|anchor| anchor.asset_id.as_str())
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn test_empty_timeline_has_no_neighbours() {
        let timeline = timeline(&[asset("orphan", "2024-06-01T09:00:00Z", None)]);
        assert!(timeline.is_empty());
        assert!(timeline.nearest(utc("2024-06-01T09:00:00Z")).is_none());
        assert!(timeline.last_before(utc("2024-06-01T09:00:00Z")).is_none());
    }

    #[test]
    fn test_nearest_equidistant_prefers_earlier() {
        let assets = [
            asset("after", "2024-06-01T13:00:00Z", Some((1.0, 1.0))),
            asset("before", "2024-06-01T11:00:00Z", Some((2.0, 2.0))),
        ];
        let timeline = timeline(&assets);
        let anchor = timeline.nearest(utc("2024-06-01T12:00:00Z")).unwrap();
        assert_eq!(anchor.asset_id, "before");
    }

    #[test]
    fn test_nearest_picks_closer_side() {
        let assets = [
            asset("before", "2024-06-01T10:00:00Z", Some((1.0, 1.0))),
            asset("after", "2024-06-01T12:30:00Z", Some((2.0, 2.0))),
        ];
        let timeline = timeline(&assets);
        assert_eq!(
            timeline.nearest(utc("2024-06-01T12:00:00Z")).unwrap().asset_id,
            "after"
        );
        assert_eq!(
            timeline.nearest(utc("2024-06-01T10:30:00Z")).unwrap().asset_id,
            "before"
        );
        // Outside the covered range only one side exists.
        assert_eq!(
            timeline.nearest(utc("2024-05-01T00:00:00Z")).unwrap().asset_id,
            "before"
        );
        assert_eq!(
            timeline.nearest(utc("2024-07-01T00:00:00Z")).unwrap().asset_id,
            "after"
        );
    }

    #[test]
    fn test_exact_instant_matches_that_anchor() {
        let assets = [
            asset("a", "2024-06-01T10:00:00Z", Some((1.0, 1.0))),
            asset("b", "2024-06-01T11:00:00Z", Some((2.0, 2.0))),
        ];
        let timeline = timeline(&assets);
        let at_b = utc("2024-06-01T11:00:00Z");
        assert_eq!(timeline.nearest(at_b).unwrap().asset_id, "b");
        assert_eq!(timeline.last_before(at_b).unwrap().asset_id, "b");
    }

    #[test]
    fn test_duplicate_instants_keep_input_order() {
        let assets = [
            asset("first", "2024-06-01T10:00:00Z", Some((1.0, 1.0))),
            asset("second", "2024-06-01T10:00:00Z", Some((2.0, 2.0))),
            asset("third", "2024-06-01T10:00:00Z", Some((3.0, 3.0))),
        ];
        let timeline = timeline(&assets);
        assert_eq!(
            timeline.last_before(utc("2024-06-01T15:00:00Z")).unwrap().asset_id,
            "first"
        );
        assert_eq!(
            timeline.nearest(utc("2024-06-01T15:00:00Z")).unwrap().asset_id,
            "first"
        );
        assert_eq!(
            timeline.nearest(utc("2024-06-01T05:00:00Z")).unwrap().asset_id,
            "first"
        );
    }

    #[test]
    fn test_last_before_never_borrows_from_future() {
        let assets = [
            asset("a", "2024-06-01T10:00:00Z", Some((1.0, 1.0))),
            asset("b", "2024-06-01T14:00:00Z", Some((2.0, 2.0))),
        ];
        let timeline = timeline(&assets);
        assert!(timeline.last_before(utc("2024-06-01T09:59:59Z")).is_none());
        assert_eq!(
            timeline.last_before(utc("2024-06-01T13:59:59Z")).unwrap().asset_id,
            "a"
        );
        assert_eq!(
            timeline.last_before(utc("2024-06-02T00:00:00Z")).unwrap().asset_id,
            "b"
        );
    }
}
