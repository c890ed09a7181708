// ABOUTME: HydroApi - client for the water/rain data service backing the
// ABOUTME: built-in tools. Handles APPCODE auth, envelopes, and paging.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::{Config, DEFAULT_HYDRO_BASE_URL};

/// One row of hydrology data, keyed by the service's field names.
pub type Record = Map<String, Value>;

/// Rows requested per stations page.
pub const STATIONS_PAGE_SIZE: u32 = 100;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// One page of the stations listing.
#[derive(Debug, Clone, Deserialize)]
pub struct StationPage {
    #[serde(default)]
    pub rows: Vec<Record>,
    #[serde(rename = "totalNum")]
    pub total_num: u64,
    #[serde(rename = "pageSize")]
    pub page_size: u64,
}

impl StationPage {
    /// Number of pages in the full listing, at least one.
    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 1;
        }
        self.total_num.div_ceil(self.page_size).max(1)
    }
}

/// Client for the hydrology data service.
#[derive(Clone)]
pub struct HydroApi {
    base_url: String,
    appcode: String,
    http: reqwest::Client,
}

impl HydroApi {
    pub fn new(base_url: impl Into<String>, appcode: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            appcode: appcode.into(),
            http,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.hydro_base_url, &config.hydro_appcode)
    }

    /// Use a custom reqwest client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Reservoir readings published at `pubtime`.
    pub async fn reservoirs(&self, pubtime: &str) -> anyhow::Result<Vec<Record>> {
        let query = format!("pubtime={}", urlencoding::encode(pubtime));
        let envelope: Envelope<Vec<Record>> = self.get("reservoir", &query).await?;
        Ok(envelope.data)
    }

    /// Rain gauge readings published at `pubtime`.
    pub async fn rain(&self, pubtime: &str) -> anyhow::Result<Vec<Record>> {
        let query = format!("pubtime={}", urlencoding::encode(pubtime));
        let envelope: Envelope<Vec<Record>> = self.get("rain", &query).await?;
        Ok(envelope.data)
    }

    /// One page (1-based) of the stations in `province`.
    pub async fn stations_page(&self, province: &str, page: u64) -> anyhow::Result<StationPage> {
        let query = format!(
            "province={}&pageNum={}&pageSize={}",
            urlencoding::encode(province),
            page,
            STATIONS_PAGE_SIZE
        );
        let envelope: Envelope<StationPage> = self.get("stations", &query).await?;
        Ok(envelope.data)
    }

    /// Every station in `province`, across all pages.
    pub async fn stations(&self, province: &str) -> anyhow::Result<Vec<Record>> {
        let first = self.stations_page(province, 1).await?;
        let pages = first.page_count();
        let mut rows = first.rows;
        for page in 2..=pages {
            rows.extend(self.stations_page(province, page).await?.rows);
        }
        tracing::debug!(province, pages, rows = rows.len(), "fetched station listing");
        Ok(rows)
    }

    async fn get<T: DeserializeOwned>(&self, resource: &str, query: &str) -> anyhow::Result<T> {
        let url = format!("{}/api/water_rain/{}?{}", self.base_url, resource, query);
        tracing::debug!(%url, "hydro api request");

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("APPCODE {}", self.appcode))
            .send()
            .await
            .with_context(|| format!("requesting {}", resource))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("reading {} response", resource))?;
        if !status.is_success() {
            anyhow::bail!("{} request failed with HTTP {}: {}", resource, status.as_u16(), body);
        }
        tracing::info!(resource, bytes = body.len(), "received hydro api response");

        serde_json::from_str(&body).with_context(|| format!("decoding {} response", resource))
    }
}

impl Default for HydroApi {
    fn default() -> Self {
        Self::new(DEFAULT_HYDRO_BASE_URL, "")
    }
}
