//! Seams to the asset library: where batches come from and where corrections go.

use crate::structs::Asset;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Fetching the next page of assets failed: {0}")]
pub struct SourceError(pub String);

/// The update of one asset was rejected. Only that asset is marked as failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Update of asset {asset_id} failed: {reason}")]
pub struct UpdateSinkError {
    pub asset_id: String,
    pub reason: String,
}

/// One page of assets, in the library's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    /// Records on this page that could not be turned into an [`Asset`].
    pub skipped: usize,
}

/// A correction to write back. Only these two fields of the asset may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpdate {
    pub asset_id: String,
    pub local_time: String,
    pub zone_id: String,
}

/// Yields pages until the library is exhausted (`Ok(None)`).
#[async_trait]
pub trait AssetSource: Send {
    async fn next_page(&mut self) -> Result<Option<AssetPage>, SourceError>;
}

#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn apply(&self, update: &AssetUpdate) -> Result<(), UpdateSinkError>;
}
