use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::WrapErr;
use immich_tz_fixer::boundary::ZoneLookup;
use immich_tz_fixer::config::{API_KEY_VAR, Settings, URL_VAR};
use immich_tz_fixer::immich::ImmichClient;
use immich_tz_fixer::immich::structs::SearchFilter;
use immich_tz_fixer::pipeline::RunSummary;
use immich_tz_fixer::pipeline::events::{PipelineEvent, PipelineObserver, TracingObserver};
use immich_tz_fixer::time::{FilterBound, parse_filter_bound};
use immich_tz_fixer::{
    BatchStats, BoundaryIndex, BundledFinder, InterpolationMethod, Pipeline, ResolutionResult,
    Runner, TzFixerError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Borrow the location of the anchor closest in time.
    Nearest,
    /// Borrow the location of the latest anchor at or before the asset.
    ForwardFill,
}

impl From<Method> for InterpolationMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Nearest => Self::NearestNeighbor,
            Method::ForwardFill => Self::ForwardFill,
        }
    }
}

/// Fix timezones of Immich assets from their GPS coordinates.
#[derive(Parser, Debug)]
#[command(name = "immich-tz-fixer")]
#[command(version)]
struct Args {
    /// Only process assets whose original file name matches
    #[arg(value_name = "FILENAME")]
    filename_arg: Option<String>,

    /// Same as the positional FILENAME
    #[arg(long, conflicts_with = "filename_arg")]
    filename: Option<String>,

    /// Only assets taken at or after this time (date-only means start of day)
    #[arg(long, value_parser = parse_taken_after)]
    taken_after: Option<DateTime<Utc>>,

    /// Only assets taken at or before this time (date-only means end of day)
    #[arg(long, value_parser = parse_taken_before)]
    taken_before: Option<DateTime<Utc>>,

    /// Check the connection and API key before doing anything else
    #[arg(long)]
    check_conn: bool,

    /// Write corrected times to Immich
    #[arg(long, conflicts_with = "dry_run")]
    fix: bool,

    /// Report the changes without writing anything
    #[arg(long)]
    dry_run: bool,

    /// How assets without GPS borrow a location
    #[arg(long, value_enum, default_value_t = Method::Nearest)]
    method: Method,

    /// GeoJSON timezone boundaries with a `tzid` property; the bundled dataset is used otherwise
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// Assets per batch
    #[arg(long, default_value_t = 250)]
    page_size: u32,

    /// Batches fetched ahead of the one being resolved
    #[arg(long, default_value_t = 2)]
    queue_depth: usize,

    #[arg(long, env = URL_VAR)]
    immich_url: Option<String>,

    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    api_key: Option<String>,
}

/// What a run does once the optional connection check has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    /// Print the library size only.
    Summary,
    Process { dry_run: bool },
}

impl Args {
    fn filter(&self) -> SearchFilter {
        SearchFilter {
            filename: self.filename.clone().or_else(|| self.filename_arg.clone()),
            taken_after: self.taken_after,
            taken_before: self.taken_before,
        }
    }

    /// Filters without `--fix` or `--dry-run` still run, as a dry run.
    fn mode(&self) -> RunMode {
        if self.fix {
            RunMode::Process { dry_run: false }
        } else if self.dry_run || !self.filter().is_empty() {
            RunMode::Process { dry_run: true }
        } else {
            RunMode::Summary
        }
    }
}

fn parse_taken_after(s: &str) -> Result<DateTime<Utc>, String> {
    parse_filter_bound(s, FilterBound::Start).ok_or_else(|| format!("invalid date: {s}"))
}

fn parse_taken_before(s: &str) -> Result<DateTime<Utc>, String> {
    parse_filter_bound(s, FilterBound::End).ok_or_else(|| format!("invalid date: {s}"))
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "immich_tz_fixer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let (immich_url, client) = connect(&args)?;

    if args.check_conn {
        let user = client
            .current_user()
            .await
            .wrap_err_with(|| format!("Could not connect to {immich_url}"))?;
        println!(
            "Connected to {immich_url} as {}",
            user.email.as_deref().unwrap_or("unknown user")
        );
    }

    let filter = args.filter();
    let dry_run = match args.mode() {
        RunMode::Summary => {
            let total = client.library_total().await?;
            println!("Library contains {total} assets.");
            println!("Pass --dry-run to preview timezone fixes, or --fix to apply them.");
            return Ok(());
        }
        RunMode::Process { dry_run } => dry_run,
    };
    if dry_run && !args.dry_run {
        warn!("Neither --fix nor --dry-run given, running as a dry run");
    }

    let pipeline = Pipeline::builder()
        .lookup(zone_lookup(args.boundaries.as_deref())?)
        .method(args.method.into())
        .build();

    let expected_total = match client.count_assets(&filter).await {
        Ok(total) => total,
        Err(err) => {
            warn!("Could not estimate the number of assets: {err}");
            None
        }
    };
    if let Some(total) = expected_total {
        info!("Processing about {total} assets");
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current batch");
                cancel.cancel();
            }
        }
    });

    let runner = Runner::builder()
        .pipeline(pipeline)
        .queue_depth(args.queue_depth)
        .dry_run(dry_run)
        .maybe_expected_total(expected_total)
        .cancel(cancel)
        .build();
    let observer = |event: &PipelineEvent<'_>| {
        TracingObserver.on_event(event);
        if let PipelineEvent::ChangeProposed { result, .. } = event {
            print_proposal(result);
        }
    };
    let summary = runner
        .run(client.pager(filter, args.page_size), &client, &observer)
        .await;

    print_summary(&summary, dry_run);
    if let Some(err) = &summary.fetch_error {
        color_eyre::eyre::bail!("Stopped early, fetching assets failed: {err}");
    }
    Ok(())
}

fn connect(args: &Args) -> Result<(String, ImmichClient), TzFixerError> {
    let settings = Settings::resolve(args.immich_url.clone(), args.api_key.clone())?;
    let client = ImmichClient::builder()
        .base_url(settings.immich_url.clone())
        .api_key(settings.api_key)
        .build()?;
    Ok((settings.immich_url, client))
}

fn zone_lookup(boundaries: Option<&Path>) -> Result<Arc<dyn ZoneLookup>, TzFixerError> {
    Ok(match boundaries {
        Some(path) => Arc::new(BoundaryIndex::from_path(path)?),
        None => Arc::new(BundledFinder::new()),
    })
}

fn print_proposal(result: &ResolutionResult) {
    println!("{} [{}]", result.filename, result.source);
    println!(
        "    before: {} {}",
        result.previous_local_time.as_deref().unwrap_or("-"),
        result.previous_zone_id.as_deref().unwrap_or("-")
    );
    println!(
        "    after:  {} {}",
        result.local_time.as_deref().unwrap_or("-"),
        result.zone_id.as_deref().unwrap_or("-")
    );
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let BatchStats {
        total,
        direct,
        interpolated_nn,
        interpolated_ff,
        unresolved,
        errors,
        updated,
        already_correct,
        proposed,
        persist_failed,
        skipped,
    } = summary.stats;
    println!();
    println!("{:<24}{:>10}", "Batches", summary.batches);
    println!("{:<24}{:>10}", "Assets", total);
    println!("{:<24}{:>10}", "Direct (GPS)", direct);
    println!("{:<24}{:>10}", "Interpolated (nearest)", interpolated_nn);
    println!("{:<24}{:>10}", "Interpolated (ffill)", interpolated_ff);
    println!("{:<24}{:>10}", "Unresolved", unresolved);
    println!("{:<24}{:>10}", "Errors", errors);
    if dry_run {
        println!("{:<24}{:>10}", "Would update", proposed);
    } else {
        println!("{:<24}{:>10}", "Updated", updated);
        println!("{:<24}{:>10}", "Update failed", persist_failed);
    }
    println!("{:<24}{:>10}", "Already correct", already_correct);
    println!("{:<24}{:>10}", "Skipped (no time)", skipped);
    if summary.stopped {
        println!("Stopped on request before the library was exhausted.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("immich-tz-fixer").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_filename_as_flag_or_positional() {
        let flag = parse(&["--filename", "IMG_0001.jpg"]);
        let positional = parse(&["IMG_0001.jpg"]);
        assert_eq!(flag.filter().filename.as_deref(), Some("IMG_0001.jpg"));
        assert_eq!(flag.filter(), positional.filter());
        assert!(
            Args::try_parse_from(["immich-tz-fixer", "a.jpg", "--filename", "b.jpg"]).is_err()
        );
    }

    #[test]
    fn test_check_conn_does_not_replace_requested_work() {
        assert_eq!(
            parse(&["--check-conn", "--fix"]).mode(),
            RunMode::Process { dry_run: false }
        );
        assert_eq!(
            parse(&["--check-conn", "--dry-run"]).mode(),
            RunMode::Process { dry_run: true }
        );
        assert_eq!(parse(&["--check-conn"]).mode(), RunMode::Summary);
    }

    #[test]
    fn test_filters_without_fix_run_as_dry_run() {
        assert_eq!(
            parse(&["--taken-after", "2024-06-01"]).mode(),
            RunMode::Process { dry_run: true }
        );
        assert_eq!(parse(&[]).mode(), RunMode::Summary);
    }
}
