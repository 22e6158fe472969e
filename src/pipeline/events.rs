//! Progress notifications emitted by the runner, decoupled from any presentation.

use super::sink::SourceError;
use super::structs::{BatchStats, PersistStatus, ResolutionResult};
use tracing::{debug, error, info, warn};

#[derive(Debug)]
pub enum PipelineEvent<'a> {
    BatchStarted {
        batch: usize,
        assets: usize,
    },
    AssetProcessed {
        batch: usize,
        result: &'a ResolutionResult,
    },
    /// Dry run: a change that would have been written. Follows the asset's
    /// `AssetProcessed` event.
    ChangeProposed {
        batch: usize,
        result: &'a ResolutionResult,
    },
    BatchFinished {
        batch: usize,
        stats: &'a BatchStats,
        /// Assets processed so far in this run.
        processed: usize,
        /// Library-wide estimate, when the source could provide one.
        expected: Option<u64>,
    },
    FetchFailed {
        error: &'a SourceError,
    },
    /// A stop was requested; emitted once the in-flight batch is complete.
    Stopped {
        after_batch: usize,
    },
}

pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent<'_>);
}

impl<F> PipelineObserver for F
where
    F: Fn(&PipelineEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &PipelineEvent<'_>) {
        self(event);
    }
}

/// Writes every event to the `tracing` log, one line per asset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent<'_>) {
        match event {
            PipelineEvent::BatchStarted { batch, assets } => {
                debug!(batch, assets, "Resolving batch");
            }
            PipelineEvent::AssetProcessed { result, .. } => log_result(result),
            PipelineEvent::ChangeProposed { result, .. } => {
                debug!(
                    asset_id = %result.asset_id,
                    before = result.previous_local_time.as_deref().unwrap_or("none"),
                    after = result.local_time.as_deref().unwrap_or("none"),
                    "Proposed change"
                );
            }
            PipelineEvent::BatchFinished {
                batch,
                stats,
                processed,
                expected,
            } => match expected {
                Some(expected) => info!(batch, errors = stats.errors, "Processed {processed}/{expected} assets"),
                None => info!(batch, errors = stats.errors, "Processed {processed} assets"),
            },
            PipelineEvent::FetchFailed { error } => {
                error!("Critical batch error: {error}");
            }
            PipelineEvent::Stopped { after_batch } => {
                warn!(after_batch, "Stop requested, finished the in-flight batch");
            }
        }
    }
}

fn log_result(result: &ResolutionResult) {
    let filename = &result.filename;
    let previous = result.previous_zone_id.as_deref().unwrap_or("none");
    let zone = result.zone_id.as_deref().unwrap_or("none");

    if let Some(err) = &result.error {
        warn!(asset_id = %result.asset_id, "Fail ({filename}): {err}");
        return;
    }
    if let Some(reason) = &result.unresolved {
        info!(asset_id = %result.asset_id, "Skip ({filename}): {reason}");
        return;
    }
    match &result.persist {
        PersistStatus::Updated => {
            info!(asset_id = %result.asset_id, source = %result.source, "Update ({filename}): {previous} -> {zone}");
        }
        PersistStatus::Proposed => {
            info!(asset_id = %result.asset_id, source = %result.source, "Update ({filename}): {previous} -> {zone} (dry run)");
        }
        PersistStatus::AlreadyCorrect => {
            debug!(asset_id = %result.asset_id, "Already correct ({filename}): {zone}");
        }
        PersistStatus::Failed(reason) => {
            error!(asset_id = %result.asset_id, "Error ({filename}): {reason}");
        }
        PersistStatus::Pending | PersistStatus::Skipped => {
            debug!(asset_id = %result.asset_id, source = %result.source, "Resolved ({filename}): {zone}");
        }
    }
}
