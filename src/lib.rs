//! # Immich Timezone Fixer
//!
//! Correct the timezone of photos and videos whose capture instant is known but whose
//! displayed local time was recorded in the wrong zone (for example the server's own).
//!
//! The capture instant is never changed. Only its wall-clock representation is
//! recomputed for the place the asset was taken.
//!
//! ## Key Features
//!
//! - **Boundary lookup**: Point-in-polygon classification against timezone boundaries,
//!   from a GeoJSON dataset or from the dataset bundled with `tzf-rs`.
//! - **Interpolation**: Assets without GPS borrow the location of an anchor in the same
//!   batch, either the nearest in time or the latest preceding one.
//! - **Instant preserving conversion**: Local times carry their offset and parse back to
//!   exactly the original instant.
//! - **Batch pipeline**: Per-asset failures are isolated and counted, results are
//!   deterministic, and paging overlaps network I/O with resolution.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::{TimeZone, Utc};
//! use immich_tz_fixer::{Asset, BundledFinder, Coordinates, InterpolationMethod, Pipeline};
//!
//! let pipeline = Pipeline::builder()
//!     .lookup(Arc::new(BundledFinder::new()))
//!     .method(InterpolationMethod::ForwardFill)
//!     .build();
//!
//! let assets = vec![
//!     Asset::new(
//!         "a",
//!         Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
//!         Some(Coordinates::new(35.68, 139.76)),
//!     ),
//!     Asset::new("b", Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap(), None),
//! ];
//!
//! let report = pipeline.resolve_batch(&assets);
//! assert_eq!(
//!     report.results[1].local_time.as_deref(),
//!     Some("2024-06-01T23:00:00+09:00")
//! );
//! println!("{:?}", report.stats);
//! ```

pub mod boundary;
pub mod config;
mod error;
pub mod immich;
pub mod pipeline;
pub mod resolution;
pub mod structs;
pub mod time;
pub mod timeline;

#[cfg(test)]
mod test_support;

pub use boundary::{BoundaryIndex, BundledFinder, ZoneLookup};
pub use error::TzFixerError;
pub use pipeline::structs::{BatchReport, BatchStats, ResolutionResult, ResolutionSource};
pub use pipeline::{Pipeline, Runner};
pub use resolution::InterpolationMethod;
pub use structs::{Asset, Coordinates};
