use crate::resolution::error::ResolutionError;
use crate::structs::Asset;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;

/// How the zone of an asset was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionSource {
    /// From the asset's own GPS coordinates.
    Direct,
    /// From the coordinates of the nearest anchor in time.
    InterpolatedNn,
    /// From the coordinates of the latest preceding anchor.
    InterpolatedFf,
    Unresolved,
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Direct => "direct",
            Self::InterpolatedNn => "interpolated-nn",
            Self::InterpolatedFf => "interpolated-ff",
            Self::Unresolved => "unresolved",
        };
        f.write_str(tag)
    }
}

/// Why no zone could be assigned. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UnresolvedReason {
    /// No GPS and the interpolation method found no anchor.
    NoAnchor,
    /// No boundary contains the (possibly borrowed) coordinates.
    NoBoundary { latitude: f64, longitude: f64 },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAnchor => write!(f, "no GPS and no usable anchor"),
            Self::NoBoundary {
                latitude,
                longitude,
            } => write!(f, "no timezone boundary at ({latitude}, {longitude})"),
        }
    }
}

/// What happened when the result was handed to the update sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PersistStatus {
    /// Not handed to a sink yet.
    Pending,
    Updated,
    /// The stored zone already matches; nothing was sent.
    AlreadyCorrect,
    /// Dry run: the change was only reported.
    Proposed,
    /// Unresolved or failed results are never persisted.
    Skipped,
    Failed(String),
}

/// Outcome for one asset. The capture instant is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub asset_id: String,
    pub filename: String,
    pub capture_instant: DateTime<Utc>,
    pub source: ResolutionSource,
    pub zone_id: Option<String>,
    pub offset_seconds: Option<i32>,
    pub local_time: Option<String>,
    /// Anchor whose coordinates were borrowed, for interpolated results.
    pub borrowed_from: Option<String>,
    pub unresolved: Option<UnresolvedReason>,
    pub error: Option<ResolutionError>,
    pub previous_zone_id: Option<String>,
    pub previous_local_time: Option<String>,
    pub persist: PersistStatus,
}

impl ResolutionResult {
    /// A result for `asset` with nothing resolved yet.
    pub(crate) fn for_asset(asset: &Asset, source: ResolutionSource) -> Self {
        Self {
            asset_id: asset.id.clone(),
            filename: asset.filename.clone(),
            capture_instant: asset.capture_instant,
            source,
            zone_id: None,
            offset_seconds: None,
            local_time: None,
            borrowed_from: None,
            unresolved: None,
            error: None,
            previous_zone_id: asset.current_zone_id.clone(),
            previous_local_time: asset.current_local_time.clone(),
            persist: PersistStatus::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.zone_id.is_some() && self.local_time.is_some() && self.error.is_none()
    }

    /// Resolved, and the stored zone differs from the resolved one.
    pub fn needs_update(&self) -> bool {
        self.is_resolved() && self.previous_zone_id != self.zone_id
    }
}

/// Counts per outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub direct: usize,
    pub interpolated_nn: usize,
    pub interpolated_ff: usize,
    pub unresolved: usize,
    pub errors: usize,
    pub updated: usize,
    pub already_correct: usize,
    pub proposed: usize,
    pub persist_failed: usize,
    /// Records dropped at ingestion (missing or unreadable capture time).
    pub skipped: usize,
}

impl BatchStats {
    pub fn from_results(results: &[ResolutionResult]) -> Self {
        let mut stats = Self::default();
        for result in results {
            stats.record(result);
        }
        stats
    }

    pub fn record(&mut self, result: &ResolutionResult) {
        self.total += 1;
        if result.error.is_some() {
            self.errors += 1;
        } else if !result.is_resolved() {
            self.unresolved += 1;
        } else {
            match result.source {
                ResolutionSource::Direct => self.direct += 1,
                ResolutionSource::InterpolatedNn => self.interpolated_nn += 1,
                ResolutionSource::InterpolatedFf => self.interpolated_ff += 1,
                ResolutionSource::Unresolved => self.unresolved += 1,
            }
        }
        match result.persist {
            PersistStatus::Updated => self.updated += 1,
            PersistStatus::AlreadyCorrect => self.already_correct += 1,
            PersistStatus::Proposed => self.proposed += 1,
            PersistStatus::Failed(_) => self.persist_failed += 1,
            PersistStatus::Pending | PersistStatus::Skipped => {}
        }
    }
}

impl AddAssign for BatchStats {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.direct += other.direct;
        self.interpolated_nn += other.interpolated_nn;
        self.interpolated_ff += other.interpolated_ff;
        self.unresolved += other.unresolved;
        self.errors += other.errors;
        self.updated += other.updated;
        self.already_correct += other.already_correct;
        self.proposed += other.proposed;
        self.persist_failed += other.persist_failed;
        self.skipped += other.skipped;
    }
}

/// Results of one batch, in input order, with their counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<ResolutionResult>,
    pub stats: BatchStats,
}

impl BatchReport {
    pub fn new(results: Vec<ResolutionResult>) -> Self {
        let stats = BatchStats::from_results(&results);
        Self { results, stats }
    }

    /// Recount after the persistence step changed result statuses.
    pub(crate) fn refresh_stats(&mut self) {
        let skipped = self.stats.skipped;
        self.stats = BatchStats::from_results(&self.results);
        self.stats.skipped = skipped;
    }
}
