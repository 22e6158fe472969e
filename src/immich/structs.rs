//! Request and response bodies of the Immich API, and their mapping onto [`Asset`].

use crate::structs::{Asset, Coordinates};
use crate::time::parse_capture_instant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filters shared by the search and statistics endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub filename: Option<String>,
    pub taken_after: Option<DateTime<Utc>>,
    pub taken_before: Option<DateTime<Utc>>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.taken_after.is_none() && self.taken_before.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub is_visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_after: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub with_exif: Option<bool>,
}

impl SearchRequest {
    /// Body for `/search/statistics`: the filter without paging.
    pub fn statistics(filter: &SearchFilter) -> Self {
        Self {
            is_visible: true,
            original_file_name: filter.filename.clone(),
            taken_after: filter.taken_after,
            taken_before: filter.taken_before,
            page: None,
            size: None,
            with_exif: None,
        }
    }

    /// Body for one page of `/search/metadata`, with EXIF included.
    pub fn page(filter: &SearchFilter, page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            with_exif: Some(true),
            ..Self::statistics(filter)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifInfo {
    pub date_time_original: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: String,
    pub original_file_name: Option<String>,
    pub local_date_time: Option<String>,
    #[serde(default)]
    pub exif_info: Option<ExifInfo>,
}

impl AssetResponse {
    /// `None` when the record has no usable capture time; such records are skipped.
    pub fn into_asset(self) -> Option<Asset> {
        let exif = self.exif_info.unwrap_or_default();
        let capture_instant = exif
            .date_time_original
            .as_deref()
            .and_then(parse_capture_instant)?;
        let coordinates = match (exif.latitude, exif.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        };
        Some(Asset {
            filename: self.original_file_name.unwrap_or_else(|| "Unknown".to_string()),
            id: self.id,
            capture_instant,
            coordinates,
            current_local_time: self.local_date_time,
            current_zone_id: exif.time_zone,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAssets {
    #[serde(default)]
    pub items: Vec<AssetResponse>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub assets: SearchAssets,
}

/// Older servers answer with `count`, newer ones with `total`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatisticsResponse {
    pub total: Option<u64>,
    pub count: Option<u64>,
}

impl StatisticsResponse {
    pub fn total(&self) -> Option<u64> {
        self.total.or(self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserResponse {
    pub email: Option<String>,
}

/// Body of `PUT /assets/{id}`. Only the capture time and zone are sent, so no other
/// asset field is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssetRequest {
    pub date_time_original: String,
    pub time_zone: String,
}
