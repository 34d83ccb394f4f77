// src/lib.rs
//! Daily B3 index-composition pipeline.
//!
//! Acquires the IBOV theoretical portfolio either by scraping the rendered
//! index page or by walking the paginated structured endpoint, normalizes
//! both shapes into canonical trade records, and persists them as a
//! date-partitioned Parquet artifact in S3.

pub mod config;
pub mod normalize;
pub mod numeric;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod store;

// ---- Re-exports for the stable public surface ----
pub use crate::config::Settings;
pub use crate::pipeline::{DataOrigin, Pipeline, PipelineOutcome};
pub use crate::record::TradeRecord;
pub use crate::source::api::{
    fetch_all, FetchError, IndexApiClient, PageFetcher, PageRequest, PageResponse,
};
pub use crate::source::scrape::{PageScraper, ScrapeOutcome, WebDriverScraper};
pub use crate::store::parquet::ArtifactWriter;
pub use crate::store::s3::{ObjectUploader, S3Uploader};
pub use crate::store::StoreError;
