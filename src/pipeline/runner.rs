//! Runs the pipeline over a whole library, page by page.
//!
//! A producer task fetches pages into a bounded queue while the consumer resolves and
//! persists the previous page. Results are handed to the observer and dropped with
//! their page, so memory stays bounded by `queue_depth` pages.

use super::events::{PipelineEvent, PipelineObserver};
use super::logic::Pipeline;
use super::sink::{AssetPage, AssetSource, SourceError, UpdateSink};
use super::structs::{BatchReport, BatchStats, PersistStatus};
use crate::structs::Asset;
use bon::bon;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Totals of a run. Only counts accumulate; per-asset results go to the observer.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub stats: BatchStats,
    pub batches: usize,
    pub fetch_error: Option<String>,
    pub stopped: bool,
}

pub struct Runner {
    pipeline: Pipeline,
    queue_depth: usize,
    dry_run: bool,
    expected_total: Option<u64>,
    cancel: CancellationToken,
}

#[bon]
impl Runner {
    #[builder]
    pub fn new(
        pipeline: Pipeline,
        #[builder(default = 2)] queue_depth: usize,
        #[builder(default)] dry_run: bool,
        expected_total: Option<u64>,
        #[builder(default = CancellationToken::new())] cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            queue_depth: queue_depth.max(1),
            dry_run,
            expected_total,
            cancel,
        }
    }

    /// Processes pages until the source is exhausted, a fetch fails, or a stop is
    /// requested. A stop never interrupts a batch: the in-flight batch is resolved and
    /// persisted completely before `run` returns.
    pub async fn run<S>(
        &self,
        source: S,
        sink: &dyn UpdateSink,
        observer: &dyn PipelineObserver,
    ) -> RunSummary
    where
        S: AssetSource + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<AssetPage>(self.queue_depth);
        let producer = tokio::spawn(produce(source, tx, self.cancel.clone()));

        let mut summary = RunSummary::default();
        let mut processed = 0;
        while let Some(page) = rx.recv().await {
            summary.batches += 1;
            let batch = summary.batches;
            observer.on_event(&PipelineEvent::BatchStarted {
                batch,
                assets: page.assets.len(),
            });

            let assets = page.assets.len();
            let Some(mut report) = self.resolve(page.assets).await else {
                summary.stopped = true;
                break;
            };
            self.pipeline
                .persist(&mut report, sink, self.dry_run)
                .await;
            report.stats.skipped = page.skipped;
            processed += assets + page.skipped;

            for result in &report.results {
                observer.on_event(&PipelineEvent::AssetProcessed { batch, result });
                if result.persist == PersistStatus::Proposed {
                    observer.on_event(&PipelineEvent::ChangeProposed { batch, result });
                }
            }
            observer.on_event(&PipelineEvent::BatchFinished {
                batch,
                stats: &report.stats,
                processed,
                expected: self.expected_total,
            });
            summary.stats += report.stats;

            if self.cancel.is_cancelled() {
                summary.stopped = true;
                observer.on_event(&PipelineEvent::Stopped { after_batch: batch });
                break;
            }
        }
        drop(rx);

        match producer.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                observer.on_event(&PipelineEvent::FetchFailed { error: &error });
                summary.fetch_error = Some(error.to_string());
            }
            Err(join_error) => {
                warn!("Page producer task failed: {join_error}");
                summary.fetch_error = Some(join_error.to_string());
            }
        }
        summary
    }

    /// Resolves on the blocking pool so the producer keeps fetching meanwhile.
    /// `None` when the runtime is shutting down.
    async fn resolve(&self, assets: Vec<Asset>) -> Option<BatchReport> {
        let pipeline = self.pipeline.clone();
        match tokio::task::spawn_blocking(move || pipeline.resolve_batch(&assets)).await {
            Ok(report) => Some(report),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                warn!("Batch resolution was cancelled: {err}");
                None
            }
        }
    }
}

async fn produce<S>(
    mut source: S,
    tx: mpsc::Sender<AssetPage>,
    cancel: CancellationToken,
) -> Result<(), SourceError>
where
    S: AssetSource,
{
    loop {
        let page = tokio::select! {
            () = cancel.cancelled() => {
                debug!("Stop requested, no further pages are fetched");
                return Ok(());
            }
            page = source.next_page() => page?,
        };
        let Some(page) = page else {
            return Ok(());
        };
        if tx.send(page).await.is_err() {
            // Consumer stopped.
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InterpolationMethod;
    use crate::pipeline::events::PipelineEvent;
    use crate::pipeline::sink::{AssetUpdate, UpdateSinkError};
    use crate::boundary::ZoneLookup;
    use crate::test_support::{asset, synthetic_index};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    struct FakeSource {
        pages: VecDeque<Result<AssetPage, SourceError>>,
        fetched: Arc<Mutex<usize>>,
    }

    impl FakeSource {
        fn new(pages: Vec<Result<AssetPage, SourceError>>) -> Self {
            Self {
                pages: pages.into(),
                fetched: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl AssetSource for FakeSource {
        async fn next_page(&mut self) -> Result<Option<AssetPage>, SourceError> {
            *self.fetched.lock().unwrap() += 1;
            self.pages.pop_front().transpose()
        }
    }

    #[derive(Default)]
    struct CountingSink {
        applied: Mutex<usize>,
    }

    #[async_trait]
    impl UpdateSink for CountingSink {
        async fn apply(&self, _update: &AssetUpdate) -> Result<(), UpdateSinkError> {
            *self.applied.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn page(assets: Vec<Asset>) -> Result<AssetPage, SourceError> {
        Ok(AssetPage { assets, skipped: 0 })
    }

    fn pipeline() -> Pipeline {
        Pipeline::builder()
            .lookup(Arc::new(synthetic_index()))
            .method(InterpolationMethod::ForwardFill)
            .build()
    }

    fn ignore(_: &PipelineEvent<'_>) {}

    #[tokio::test]
    async fn test_run_processes_every_page() {
        let source = FakeSource::new(vec![
            page(vec![
                asset("a", "2024-06-01T10:00:00Z", Some((35.68, 139.76))),
                asset("b", "2024-06-01T11:00:00Z", None),
            ]),
            Ok(AssetPage {
                assets: vec![asset("c", "2024-06-02T10:00:00Z", None)],
                skipped: 2,
            }),
        ]);
        let sink = CountingSink::default();
        let runner = Runner::builder().pipeline(pipeline()).build();

        let summary = runner.run(source, &sink, &ignore).await;

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.stats.total, 3);
        assert_eq!(summary.stats.direct, 1);
        assert_eq!(summary.stats.interpolated_ff, 1);
        // Anchors never cross batches: "c" has no anchor on its own page.
        assert_eq!(summary.stats.unresolved, 1);
        assert_eq!(summary.stats.skipped, 2);
        assert_eq!(summary.stats.updated, 2);
        assert_eq!(*sink.applied.lock().unwrap(), 2);
        assert!(summary.fetch_error.is_none());
        assert!(!summary.stopped);
    }

    #[tokio::test]
    async fn test_dry_run_collects_proposals() {
        let source = FakeSource::new(vec![page(vec![asset(
            "a",
            "2024-06-01T10:00:00Z",
            Some((35.68, 139.76)),
        )])]);
        let sink = CountingSink::default();
        let runner = Runner::builder()
            .pipeline(pipeline())
            .dry_run(true)
            .build();

        let proposed = Mutex::new(Vec::new());
        let observer = |event: &PipelineEvent<'_>| {
            if let PipelineEvent::ChangeProposed { result, .. } = event {
                proposed.lock().unwrap().push(result.zone_id.clone());
            }
        };

        let summary = runner.run(source, &sink, &observer).await;

        assert_eq!(*sink.applied.lock().unwrap(), 0);
        assert_eq!(*proposed.lock().unwrap(), [Some("Asia/Tokyo".to_string())]);
        assert_eq!(summary.stats.proposed, 1);
    }

    #[tokio::test]
    async fn test_dry_run_reports_each_page_before_the_next_starts() {
        let pages = (0..40)
            .map(|p| {
                page(
                    (0..25)
                        .map(|i| {
                            let id = format!("p{p}-{i}");
                            asset(&id, "2024-06-01T10:00:00Z", Some((35.68, 139.76)))
                        })
                        .collect(),
                )
            })
            .collect();
        let sink = CountingSink::default();
        let runner = Runner::builder()
            .pipeline(pipeline())
            .dry_run(true)
            .build();
        let current_batch = Mutex::new(0);
        let per_batch = Mutex::new(vec![0usize; 41]);
        let observer = |event: &PipelineEvent<'_>| match event {
            PipelineEvent::BatchStarted { batch, .. } => *current_batch.lock().unwrap() = *batch,
            PipelineEvent::ChangeProposed { batch, .. } => {
                assert_eq!(*batch, *current_batch.lock().unwrap());
                per_batch.lock().unwrap()[*batch] += 1;
            }
            _ => {}
        };

        let summary = runner.run(FakeSource::new(pages), &sink, &observer).await;

        assert_eq!(summary.batches, 40);
        assert_eq!(summary.stats.proposed, 1_000);
        assert!(per_batch.lock().unwrap()[1..].iter().all(|&n| n == 25));
        assert_eq!(*sink.applied.lock().unwrap(), 0);
    }

    /// Blocks until the source has been asked for a second page, or gives up.
    struct WaitForPrefetch {
        fetched: Arc<Mutex<usize>>,
        saw_prefetch: Mutex<bool>,
    }

    impl ZoneLookup for WaitForPrefetch {
        fn lookup(&self, _latitude: f64, _longitude: f64) -> Option<&str> {
            let deadline = Instant::now() + Duration::from_secs(2);
            while Instant::now() < deadline {
                if *self.fetched.lock().unwrap() >= 2 {
                    *self.saw_prefetch.lock().unwrap() = true;
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Some("Asia/Tokyo")
        }
    }

    #[tokio::test]
    async fn test_producer_keeps_fetching_while_a_batch_resolves() {
        let source = FakeSource::new(vec![
            page(vec![asset("a", "2024-06-01T10:00:00Z", Some((35.68, 139.76)))]),
            page(vec![asset("b", "2024-06-02T10:00:00Z", None)]),
        ]);
        let lookup = Arc::new(WaitForPrefetch {
            fetched: Arc::clone(&source.fetched),
            saw_prefetch: Mutex::new(false),
        });
        let runner = Runner::builder()
            .pipeline(Pipeline::builder().lookup(lookup.clone()).build())
            .queue_depth(1)
            .build();

        let summary = runner
            .run(source, &CountingSink::default(), &ignore)
            .await;

        assert_eq!(summary.batches, 2);
        assert!(*lookup.saw_prefetch.lock().unwrap());
    }

    #[tokio::test]
    async fn test_fetch_error_ends_run_after_processed_pages() {
        let source = FakeSource::new(vec![
            page(vec![asset("a", "2024-06-01T10:00:00Z", Some((35.68, 139.76)))]),
            Err(SourceError("connection reset".to_string())),
            page(vec![asset("never", "2024-06-01T10:00:00Z", Some((35.68, 139.76)))]),
        ]);
        let sink = CountingSink::default();
        let runner = Runner::builder().pipeline(pipeline()).build();
        let failures = Mutex::new(0);
        let observer = |event: &PipelineEvent<'_>| {
            if matches!(event, PipelineEvent::FetchFailed { .. }) {
                *failures.lock().unwrap() += 1;
            }
        };

        let summary = runner.run(source, &sink, &observer).await;

        assert_eq!(summary.batches, 1);
        assert_eq!(summary.stats.total, 1);
        assert!(summary.fetch_error.unwrap().contains("connection reset"));
        assert_eq!(*failures.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_batch_finish() {
        let cancel = CancellationToken::new();
        let source = FakeSource::new(vec![
            page(vec![
                asset("a", "2024-06-01T10:00:00Z", Some((35.68, 139.76))),
                asset("b", "2024-06-01T11:00:00Z", Some((35.68, 139.76))),
            ]),
            page(vec![asset("c", "2024-06-01T12:00:00Z", Some((35.68, 139.76)))]),
            page(vec![asset("d", "2024-06-01T13:00:00Z", Some((35.68, 139.76)))]),
        ]);
        let fetched = Arc::clone(&source.fetched);
        let sink = CountingSink::default();
        let runner = Runner::builder()
            .pipeline(pipeline())
            .queue_depth(1)
            .cancel(cancel.clone())
            .build();
        let seen = Mutex::new(Vec::new());
        let observer = |event: &PipelineEvent<'_>| {
            if let PipelineEvent::AssetProcessed { result, .. } = event {
                seen.lock().unwrap().push(result.asset_id.clone());
                // Requested mid-batch; the rest of this batch must still complete.
                cancel.cancel();
            }
        };

        let summary = runner.run(source, &sink, &observer).await;

        assert!(summary.stopped);
        assert_eq!(summary.batches, 1);
        assert_eq!(*seen.lock().unwrap(), ["a", "b"]);
        assert_eq!(*sink.applied.lock().unwrap(), 2);
        assert!(*fetched.lock().unwrap() <= 3);
    }
}
