// src/store/mod.rs
pub mod parquet;
pub mod s3;

use thiserror::Error;

/// Failures while producing or shipping the output artifact. No retries at
/// this layer; the orchestrator's fault boundary turns them into a failure
/// outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
    #[error("building parquet artifact: {0}")]
    Parquet(#[from] polars::prelude::PolarsError),
    #[error("upload: {0}")]
    Upload(String),
}
