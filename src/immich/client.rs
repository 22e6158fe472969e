use super::error::ImmichError;
use super::structs::{
    AssetResponse, SearchFilter, SearchRequest, SearchResponse, StatisticsResponse,
    UpdateAssetRequest, UserResponse,
};
use crate::pipeline::sink::{
    AssetPage, AssetSource, AssetUpdate, SourceError, UpdateSink, UpdateSinkError,
};
use async_trait::async_trait;
use bon::bon;
use reqwest::{Method, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin client for the parts of the Immich API this tool needs.
#[derive(Clone)]
pub struct ImmichClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[bon]
impl ImmichClient {
    /// # Builder Arguments
    ///
    /// * `base_url` - Server root such as `https://photos.example.com`; a trailing `/` is ignored.
    /// * `api_key` - API key sent in the `x-api-key` header.
    /// * `timeout` - (Default: 10 s) Timeout for requests other than searches, which get 30 s.
    #[builder]
    pub fn new(
        base_url: String,
        api_key: String,
        #[builder(default = Duration::from_secs(10))] timeout: Duration,
    ) -> Result<Self, ImmichError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ImmichError::InvalidUrl(base_url));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("immich-tz-fixer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%method, %url, "Immich request");
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// `GET /users/me`: verifies the URL and key.
    pub async fn current_user(&self) -> Result<UserResponse, ImmichError> {
        let response = self.request(Method::GET, "users/me").send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Number of assets matching the filter, if the server can tell.
    pub async fn count_assets(&self, filter: &SearchFilter) -> Result<Option<u64>, ImmichError> {
        let response = self
            .request(Method::POST, "search/statistics")
            .json(&SearchRequest::statistics(filter))
            .send()
            .await?;
        let stats: StatisticsResponse = check(response).await?.json().await?;
        Ok(stats.total())
    }

    /// Total number of visible assets in the library.
    pub async fn library_total(&self) -> Result<u64, ImmichError> {
        let response = self
            .request(Method::POST, "search/metadata")
            .json(&serde_json::json!({ "isVisible": true, "size": 1 }))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;
        let search: SearchResponse = check(response).await?.json().await?;
        Ok(search.assets.total.unwrap_or(0))
    }

    /// One page of `POST /search/metadata`, 1-based.
    pub async fn search_page(
        &self,
        filter: &SearchFilter,
        page: u32,
        size: u32,
    ) -> Result<Vec<AssetResponse>, ImmichError> {
        let response = self
            .request(Method::POST, "search/metadata")
            .json(&SearchRequest::page(filter, page, size))
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;
        let search: SearchResponse = check(response).await?.json().await?;
        Ok(search.assets.items)
    }

    /// `PUT /assets/{id}` with the corrected capture time and zone.
    pub async fn update_asset(
        &self,
        asset_id: &str,
        local_time: &str,
        zone_id: &str,
    ) -> Result<(), ImmichError> {
        let body = UpdateAssetRequest {
            date_time_original: local_time.to_string(),
            time_zone: zone_id.to_string(),
        };
        let response = self
            .request(Method::PUT, &format!("assets/{asset_id}"))
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub fn pager(&self, filter: SearchFilter, page_size: u32) -> AssetPager {
        AssetPager {
            client: self.clone(),
            filter,
            page_size: page_size.max(1),
            next_page: 1,
            exhausted: false,
        }
    }
}

async fn check(response: Response) -> Result<Response, ImmichError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ImmichError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Walks `/search/metadata` page by page until a short or empty page.
pub struct AssetPager {
    client: ImmichClient,
    filter: SearchFilter,
    page_size: u32,
    next_page: u32,
    exhausted: bool,
}

#[async_trait]
impl AssetSource for AssetPager {
    async fn next_page(&mut self) -> Result<Option<AssetPage>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }
        let items = self
            .client
            .search_page(&self.filter, self.next_page, self.page_size)
            .await
            .map_err(|e| SourceError(e.to_string()))?;
        self.next_page += 1;

        let (page, exhausted) = page_from_items(items, self.page_size);
        self.exhausted = exhausted;
        Ok(page)
    }
}

/// Maps one search response onto an [`AssetPage`]. The flag is `true` when no page
/// follows: this one was empty or shorter than `page_size`.
fn page_from_items(items: Vec<AssetResponse>, page_size: u32) -> (Option<AssetPage>, bool) {
    let received = items.len();
    let exhausted = (received as u64) < u64::from(page_size);
    if received == 0 {
        return (None, true);
    }

    let assets: Vec<_> = items
        .into_iter()
        .filter_map(AssetResponse::into_asset)
        .collect();
    let page = AssetPage {
        skipped: received - assets.len(),
        assets,
    };
    (Some(page), exhausted)
}

#[async_trait]
impl UpdateSink for ImmichClient {
    async fn apply(&self, update: &AssetUpdate) -> Result<(), UpdateSinkError> {
        self.update_asset(&update.asset_id, &update.local_time, &update.zone_id)
            .await
            .map_err(|e| UpdateSinkError {
                asset_id: update.asset_id.clone(),
                reason: e.to_string(),
            })
    }
}
