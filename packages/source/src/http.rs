//! Paginated HTTP incident source.
//!
//! The incident listing is served as `{results, next}` pages addressed by
//! a `page` query parameter starting at 1. Pages are requested in order
//! until one reports no `next` page. Grid cells come from a single
//! unpaginated endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crime_dash_crime_models::GridCell;
use crime_dash_source_models::{FetchHints, IncidentPage, RawGridCell, RawIncident};

use crate::cache::{DEFAULT_TTL, FetchCache};
use crate::progress::{ProgressCallback, null_progress};
use crate::retry::{self, RetryPolicy};
use crate::{IncidentSource, SourceError};

/// Base URL of the public incident service.
pub const DEFAULT_BASE_URL: &str = "https://admin.smartalmaty.kz/criminalism";

/// Path of the paginated incident listing.
pub const INCIDENTS_PATH: &str = "/crimes/";

/// Path of the grid cell catalog.
pub const GRID_CELLS_PATH: &str = "/hexes/get_hexes/";

/// Cache key of the grid cell catalog.
const GRID_CELLS_KEY: &str = "hexagons";

/// Settings for [`HttpIncidentSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceConfig {
    /// Service root, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Pause between consecutive page requests.
    pub page_delay: Duration,
    /// Retry policy for each request.
    pub retry: RetryPolicy,
    /// How long fetched responses are reused.
    pub cache_ttl: Duration,
    /// Stop after this many pages even if more are reported.
    pub max_pages: Option<u32>,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            page_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            cache_ttl: DEFAULT_TTL,
            max_pages: None,
        }
    }
}

/// [`IncidentSource`] backed by the incident service's JSON API.
pub struct HttpIncidentSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
    pages: FetchCache<IncidentPage>,
    cells: FetchCache<Vec<RawGridCell>>,
    progress: Arc<dyn ProgressCallback>,
}

impl HttpIncidentSource {
    /// Creates a source with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            pages: FetchCache::new(),
            cells: FetchCache::new(),
            progress: null_progress(),
        })
    }

    /// Reports page progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Query parameters of one listing page: `page` first, then the hints.
    fn page_query(page: u32, hints: &FetchHints) -> Vec<(String, String)> {
        std::iter::once(("page".to_string(), page.to_string()))
            .chain(hints.params().map(|(k, v)| (k.to_string(), v.to_string())))
            .collect()
    }

    fn page_cache_key(query: &[(String, String)]) -> String {
        let joined = query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("crimes_{joined}")
    }

    /// Fetches one listing page, from cache when fresh.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails after retries.
    pub async fn fetch_page(
        &self,
        page: u32,
        hints: &FetchHints,
    ) -> Result<IncidentPage, SourceError> {
        let query = Self::page_query(page, hints);
        let key = Self::page_cache_key(&query);
        let url = self.url(INCIDENTS_PATH);

        self.pages
            .fetch_with_cache(&key, self.config.cache_ttl, || {
                log::debug!("Fetching incident page {page}: {url}");
                retry::send_json(
                    || self.client.get(&url).query(&query),
                    &self.config.retry,
                    self.config.request_timeout,
                )
            })
            .await
    }
}

#[async_trait]
impl IncidentSource for HttpIncidentSource {
    async fn fetch_all_incidents(
        &self,
        hints: &FetchHints,
    ) -> Result<Vec<RawIncident>, SourceError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let body = self
                .fetch_page(page, hints)
                .await
                .inspect_err(|e| log::error!("Error fetching page {page}: {e}"))?;

            let count = body.results.len() as u64;
            records.extend(body.results);
            self.progress
                .page_fetched(page, count, records.len() as u64);
            log::debug!("Page {page}: {count} records (total: {})", records.len());

            if body.next.is_none() {
                break;
            }
            if let Some(max) = self.config.max_pages
                && page >= max
            {
                log::warn!("Stopping after {max} pages; more were reported");
                break;
            }

            page += 1;
            if !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }

        self.progress.finish(records.len() as u64);
        log::info!("Fetched {} incidents in {page} page(s)", records.len());

        Ok(records)
    }

    async fn fetch_grid_cells(&self) -> Result<Vec<GridCell>, SourceError> {
        let url = self.url(GRID_CELLS_PATH);
        let raw = self
            .cells
            .fetch_with_cache(GRID_CELLS_KEY, self.config.cache_ttl, || {
                log::debug!("Fetching grid cells: {url}");
                retry::send_json::<Vec<RawGridCell>, _>(
                    || self.client.get(&url),
                    &self.config.retry,
                    self.config.request_timeout,
                )
            })
            .await?;

        let cells: Vec<GridCell> = raw.iter().filter_map(RawGridCell::to_grid_cell).collect();
        if cells.len() < raw.len() {
            log::warn!(
                "Skipped {} grid cells without id or center",
                raw.len() - cells.len()
            );
        }

        Ok(cells)
    }

    fn clear_cache(&self) {
        self.pages.clear();
        self.cells.clear();
        log::debug!("Fetch cache cleared");
    }
}
