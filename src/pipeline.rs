// src/pipeline.rs
//! Source selection, conversion, and persistence for one daily run.
//!
//! The orchestrator prefers the scraped page and falls back to the
//! structured endpoint, then normalizes, writes the Parquet artifact, and
//! uploads it. Every failure, at any stage, is folded into the returned
//! [`PipelineOutcome`]; callers never see an `Err` or a panic from `run`.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::normalize::{self, Normalized};
use crate::source::api::{fetch_all, PageFetcher};
use crate::source::scrape::PageScraper;
use crate::store::parquet::ArtifactWriter;
use crate::store::s3::ObjectUploader;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Pipeline invocations.");
        describe_counter!(
            "pipeline_failures_total",
            "Runs that ended in a failure outcome."
        );
        describe_counter!(
            "source_fallback_total",
            "Runs that fell back to the structured endpoint."
        );
        describe_counter!(
            "pipeline_records_total",
            "Canonical records written to the artifact."
        );
        describe_histogram!("pipeline_duration_ms", "Run duration in milliseconds.");
    });
}

/// Which source actually produced the run's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Scrape,
    Api,
}

impl DataOrigin {
    pub fn label(self) -> &'static str {
        match self {
            DataOrigin::Scrape => "scrape",
            DataOrigin::Api => "api",
        }
    }
}

/// The single value handed back to the caller. Failures are carried here,
/// never raised.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub success: bool,
    pub message: String,
    pub records_processed: usize,
    pub data_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataOrigin>,
}

impl PipelineOutcome {
    fn failure(message: impl Into<String>, data_date: NaiveDate, started: Instant) -> Self {
        Self {
            success: false,
            message: message.into(),
            records_processed: 0,
            data_date,
            object_key: None,
            elapsed_ms: started.elapsed().as_millis() as u64,
            data_source: None,
        }
    }
}

/// Composes scraper, fetcher, writer, and uploader; owns the fallback
/// policy and the top-level fault boundary.
pub struct Pipeline {
    scraper: Arc<dyn PageScraper>,
    fetcher: Arc<dyn PageFetcher>,
    writer: ArtifactWriter,
    uploader: Arc<dyn ObjectUploader>,
}

impl Pipeline {
    pub fn new(
        scraper: Arc<dyn PageScraper>,
        fetcher: Arc<dyn PageFetcher>,
        writer: ArtifactWriter,
        uploader: Arc<dyn ObjectUploader>,
    ) -> Self {
        Self {
            scraper,
            fetcher,
            writer,
            uploader,
        }
    }

    /// Run the full pipeline for `date` (today when `None`). Never returns
    /// an error: any failure becomes a failure outcome carrying the elapsed
    /// time so far.
    pub async fn run(&self, date: Option<NaiveDate>) -> PipelineOutcome {
        ensure_metrics_described();
        let started = Instant::now();
        let data_date = date.unwrap_or_else(|| Local::now().date_naive());
        counter!("pipeline_runs_total").increment(1);

        let outcome = match self.execute(data_date, started).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = ?e, date = %data_date, "pipeline run failed");
                PipelineOutcome::failure(format!("internal error: {e:#}"), data_date, started)
            }
        };

        if !outcome.success {
            counter!("pipeline_failures_total").increment(1);
        }
        histogram!("pipeline_duration_ms").record(outcome.elapsed_ms as f64);
        outcome
    }

    async fn execute(
        &self,
        data_date: NaiveDate,
        started: Instant,
    ) -> anyhow::Result<PipelineOutcome> {
        tracing::info!(date = %data_date, "starting pipeline run");

        // 1) Preferred source: the rendered page. Usable only when it
        //    reports success and carries at least one row.
        let scraped = self.scraper.scrape().await;
        let usable_rows = if scraped.success {
            scraped.rows.filter(|rows| !rows.is_empty())
        } else {
            None
        };

        let (normalized, origin) = match usable_rows {
            Some(rows) => {
                tracing::info!(
                    rows = rows.len(),
                    source = self.scraper.name(),
                    date_label = %scraped.date_label,
                    "using scraped data"
                );
                (
                    normalize::from_scraped_rows(&rows, data_date),
                    DataOrigin::Scrape,
                )
            }
            None => {
                // 2) Fallback: the structured endpoint, regardless of why
                //    the scrape was unusable.
                tracing::warn!(
                    message = %scraped.message,
                    source = self.scraper.name(),
                    "scrape unusable, falling back to the index endpoint"
                );
                counter!("source_fallback_total").increment(1);

                let first = self.fetcher.build_request(1);
                let page = fetch_all(self.fetcher.as_ref(), first)
                    .await
                    .context("fetching index composition")?;
                if page.results.is_empty() {
                    tracing::warn!("both sources came back empty");
                    return Ok(PipelineOutcome::failure(
                        "no data obtained via scraping or the index endpoint",
                        data_date,
                        started,
                    ));
                }
                tracing::info!(
                    items = page.results.len(),
                    source = self.fetcher.name(),
                    "using endpoint data"
                );
                (
                    normalize::from_api_items(&page.results, data_date),
                    DataOrigin::Api,
                )
            }
        };

        // 3) Canonical records. Skips are diagnostics, not failures.
        let Normalized { records, skips } = normalized;
        if !skips.is_empty() {
            tracing::warn!(
                skipped = skips.len(),
                source = origin.label(),
                "rows skipped during conversion"
            );
        }
        if records.is_empty() {
            return Ok(PipelineOutcome::failure(
                "no valid records after conversion",
                data_date,
                started,
            ));
        }

        // 4) Persist, upload, then drop the local copy. Write or upload
        //    errors leave the temporary file in place.
        let path = self
            .writer
            .write(&records, data_date)
            .context("writing parquet artifact")?;
        let key = self
            .uploader
            .upload(&path, data_date)
            .await
            .context("uploading artifact")?;
        std::fs::remove_file(&path)
            .with_context(|| format!("removing temporary artifact {}", path.display()))?;

        counter!("pipeline_records_total").increment(records.len() as u64);
        tracing::info!(
            records = records.len(),
            key = %key,
            source = origin.label(),
            "pipeline run finished"
        );

        Ok(PipelineOutcome {
            success: true,
            message: format!("pipeline completed successfully via {}", origin.label()),
            records_processed: records.len(),
            data_date,
            object_key: Some(key),
            elapsed_ms: started.elapsed().as_millis() as u64,
            data_source: Some(origin),
        })
    }
}
