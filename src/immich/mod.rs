//! Immich server API: asset search, statistics and metadata updates.
mod client;
pub mod error;
pub mod structs;

pub use client::{AssetPager, ImmichClient};
