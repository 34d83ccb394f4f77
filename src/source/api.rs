// src/source/api.rs
//! Paginated fetcher for the structured index-composition endpoint.
//!
//! The endpoint takes no query string: the whole request object is
//! serialized to camelCase JSON and appended to the base path as a URL-safe
//! unpadded base64 token. Responses are page-shaped; `fetch_all` walks the
//! pages serially and concatenates the result items.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ApiSettings;

pub const PORTFOLIO_DAY_URL: &str =
    "https://sistemaswebb3-listados.b3.com.br/indexProxy/indexCall/GetPortfolioDay/";

/// Request defaults for the IBOV daily portfolio.
pub const DEFAULT_LANGUAGE: &str = "pt-br";
pub const DEFAULT_PAGE_SIZE: u32 = 99_999;
pub const DEFAULT_INDEX: &str = "IBOV";
pub const DEFAULT_SEGMENT: &str = "1";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response shape: {0}")]
    Payload(#[source] serde_json::Error),
    #[error("encoding request token: {0}")]
    Token(#[source] serde_json::Error),
}

/// One page worth of request parameters. `page_number` is the only field
/// varied across pagination. Field order matters: the serialized JSON is
/// part of the URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub language: String,
    pub page_number: u32,
    pub page_size: u32,
    pub index: String,
    pub segment: String,
}

impl PageRequest {
    pub fn for_page(page_number: u32) -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            page_number,
            page_size: DEFAULT_PAGE_SIZE,
            index: DEFAULT_INDEX.to_string(),
            segment: DEFAULT_SEGMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: u32,
    pub page_size: u32,
    pub total_records: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexHeader {
    pub date: String,
    pub text: String,
    pub part: String,
    pub part_acum: Option<String>,
    pub text_reductor: String,
    pub reductor: String,
    pub theorical_qty: String,
}

/// One constituent as returned by the endpoint. Numeric values arrive as
/// pt-BR formatted strings and stay raw here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub segment: Option<String>,
    pub cod: Option<String>,
    pub asset: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub part: String,
    pub part_acum: Option<String>,
    pub theorical_qty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse {
    pub page: PageInfo,
    pub header: IndexHeader,
    pub results: Vec<IndexEntry>,
}

/// Encode a request as the endpoint's URL token: canonical JSON, URL-safe
/// base64 without padding.
pub fn request_token(request: &PageRequest) -> Result<String, FetchError> {
    let json = serde_json::to_string(request).map_err(FetchError::Token)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Transport seam for one page of structured data. `fetch_all` drives any
/// implementation, so the pagination logic is testable with a fake.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError>;

    /// Request template for a page, every other field at its configured
    /// default.
    fn build_request(&self, page_number: u32) -> PageRequest {
        PageRequest::for_page(page_number)
    }

    fn name(&self) -> &'static str;
}

/// HTTP client for the index endpoint.
pub struct IndexApiClient {
    http: reqwest::Client,
    base_url: String,
    language: String,
    page_size: u32,
    index: String,
    segment: String,
}

impl IndexApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            language: settings.language.clone(),
            page_size: settings.page_size,
            index: settings.index.clone(),
            segment: settings.segment.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for IndexApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        let url = format!("{}{}", self.base_url, request_token(request)?);
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        serde_json::from_str(&body).map_err(FetchError::Payload)
    }

    fn build_request(&self, page_number: u32) -> PageRequest {
        PageRequest {
            language: self.language.clone(),
            page_number,
            page_size: self.page_size,
            index: self.index.clone(),
            segment: self.segment.clone(),
        }
    }

    fn name(&self) -> &'static str {
        "index-api"
    }
}

/// Fetch every page serially: page 1 first, then 2..=total_pages as
/// reported by the first page's metadata. Each response is fully consumed
/// before the next request goes out; results are concatenated in page
/// order while header and page metadata stay those of the first page. A
/// single failed page aborts the whole attempt.
pub async fn fetch_all(
    fetcher: &dyn PageFetcher,
    first: PageRequest,
) -> Result<PageResponse, FetchError> {
    let mut assembled = fetcher.fetch_page(&first).await?;
    let total_pages = assembled.page.total_pages;
    let mut current = first.page_number;
    while current < total_pages {
        current += 1;
        let next = PageRequest {
            page_number: current,
            ..first.clone()
        };
        let mut page = fetcher.fetch_page(&next).await?;
        assembled.results.append(&mut page.results);
    }
    Ok(assembled)
}
