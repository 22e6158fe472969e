//! Resolving a batch of assets to zones and local times, then persisting the changes.

use super::sink::{AssetUpdate, UpdateSink};
use super::structs::{BatchReport, PersistStatus, ResolutionResult, ResolutionSource, UnresolvedReason};
use crate::boundary::ZoneLookup;
use crate::resolution::error::ResolutionError;
use crate::resolution::{InterpolationMethod, convert, interpolate};
use crate::structs::{Asset, Coordinates};
use crate::timeline::AnchorTimeline;
use bon::bon;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// The resolution engine for one run: a zone lookup and the interpolation method.
///
/// Construct it once and reuse it for every batch:
/// ```rust
/// # use std::sync::Arc;
/// # use immich_tz_fixer::{BundledFinder, InterpolationMethod, Pipeline};
/// let pipeline = Pipeline::builder()
///     .lookup(Arc::new(BundledFinder::new()))
///     .method(InterpolationMethod::ForwardFill)
///     .build();
/// ```
#[derive(Clone)]
pub struct Pipeline {
    lookup: Arc<dyn ZoneLookup>,
    method: InterpolationMethod,
}

#[bon]
impl Pipeline {
    #[builder]
    pub fn new(lookup: Arc<dyn ZoneLookup>, #[builder(default)] method: InterpolationMethod) -> Self {
        Self { lookup, method }
    }

    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Resolves every asset of the batch. Pure: nothing is written anywhere.
    ///
    /// Anchors are taken from this batch only. The returned results are in input order,
    /// one per asset, and identical across calls with the same input.
    pub fn resolve_batch(&self, assets: &[Asset]) -> BatchReport {
        let timeline = AnchorTimeline::build(assets);
        debug!(
            assets = assets.len(),
            anchors = timeline.len(),
            method = %self.method,
            "Built anchor timeline"
        );
        let results = assets
            .par_iter()
            .map(|asset| self.resolve_asset(asset, &timeline))
            .collect();
        BatchReport::new(results)
    }

    /// Resolves a batch and hands every resolved change to `sink`.
    ///
    /// Resolution runs on the calling thread. [`Runner`](super::Runner) moves it to the
    /// blocking pool instead and only awaits [`Pipeline::persist`].
    pub async fn process_batch(
        &self,
        assets: &[Asset],
        sink: &dyn UpdateSink,
        dry_run: bool,
    ) -> BatchReport {
        let mut report = self.resolve_batch(assets);
        self.persist(&mut report, sink, dry_run).await;
        report
    }

    /// Hands every resolved change of `report` to `sink` and recounts its stats.
    ///
    /// With `dry_run` the sink is never called and changes are marked as proposed.
    pub async fn persist(&self, report: &mut BatchReport, sink: &dyn UpdateSink, dry_run: bool) {
        persist_results(&mut report.results, sink, dry_run).await;
        report.refresh_stats();
    }

    pub fn resolve_asset(&self, asset: &Asset, timeline: &AnchorTimeline) -> ResolutionResult {
        match asset.coordinates {
            Some(coordinates) if !coordinates.is_valid() => {
                let mut result = ResolutionResult::for_asset(asset, ResolutionSource::Direct);
                result.error = Some(ResolutionError::InvalidCoordinates {
                    latitude: coordinates.latitude,
                    longitude: coordinates.longitude,
                });
                result
            }
            Some(coordinates) => {
                let result = ResolutionResult::for_asset(asset, ResolutionSource::Direct);
                self.locate(result, coordinates)
            }
            None => match interpolate(asset, timeline, self.method) {
                Some(anchor) => {
                    let mut result = ResolutionResult::for_asset(asset, self.interpolated_source());
                    result.borrowed_from = Some(anchor.asset_id.clone());
                    self.locate(result, anchor.coordinates)
                }
                None => {
                    let mut result = ResolutionResult::for_asset(asset, ResolutionSource::Unresolved);
                    result.unresolved = Some(UnresolvedReason::NoAnchor);
                    result
                }
            },
        }
    }

    fn interpolated_source(&self) -> ResolutionSource {
        match self.method {
            InterpolationMethod::NearestNeighbor => ResolutionSource::InterpolatedNn,
            InterpolationMethod::ForwardFill => ResolutionSource::InterpolatedFf,
        }
    }

    fn locate(&self, mut result: ResolutionResult, coordinates: Coordinates) -> ResolutionResult {
        let Some(zone_id) = self
            .lookup
            .lookup(coordinates.latitude, coordinates.longitude)
        else {
            result.source = ResolutionSource::Unresolved;
            result.unresolved = Some(UnresolvedReason::NoBoundary {
                latitude: coordinates.latitude,
                longitude: coordinates.longitude,
            });
            return result;
        };

        match convert(result.capture_instant, zone_id) {
            Ok(local) => {
                result.zone_id = Some(zone_id.to_string());
                result.offset_seconds = Some(local.offset_seconds);
                result.local_time = Some(local.local_time);
            }
            Err(err) => result.error = Some(err),
        }
        result
    }
}

/// Sends changed results to the sink one by one; a rejected update only marks that result.
async fn persist_results(results: &mut [ResolutionResult], sink: &dyn UpdateSink, dry_run: bool) {
    for result in results.iter_mut() {
        let (Some(zone_id), Some(local_time)) = (&result.zone_id, &result.local_time) else {
            result.persist = PersistStatus::Skipped;
            continue;
        };
        if result.error.is_some() {
            result.persist = PersistStatus::Skipped;
            continue;
        }
        if !result.needs_update() {
            result.persist = PersistStatus::AlreadyCorrect;
            continue;
        }
        if dry_run {
            result.persist = PersistStatus::Proposed;
            continue;
        }

        let update = AssetUpdate {
            asset_id: result.asset_id.clone(),
            local_time: local_time.clone(),
            zone_id: zone_id.clone(),
        };
        result.persist = match sink.apply(&update).await {
            Ok(()) => PersistStatus::Updated,
            Err(err) => PersistStatus::Failed(err.reason),
        };
    }
}
