// src/main.rs
//! CLI entry point standing in for the orchestration caller.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use b3_daily_pipeline::config::Settings;
use b3_daily_pipeline::pipeline::Pipeline;
use b3_daily_pipeline::source::api::{fetch_all, IndexApiClient, PageFetcher};
use b3_daily_pipeline::source::scrape::{PageScraper, WebDriverScraper};
use b3_daily_pipeline::store::parquet::ArtifactWriter;
use b3_daily_pipeline::store::s3::S3Uploader;

#[derive(Parser)]
#[command(
    name = "b3-daily-pipeline",
    about = "Daily B3 index-composition pipeline",
    version
)]
struct Cli {
    /// Explicit settings file (otherwise $B3_PIPELINE_CONFIG, then
    /// config/pipeline.toml, then built-in defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: acquire, normalize, write, upload.
    Run {
        /// Partition date (YYYY-MM-DD); today when omitted.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Fetch the full composition from the structured endpoint and print it.
    Fetch,
    /// Scrape the rendered page and print the outcome.
    Scrape,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Command::Run { date } => {
            let pipeline = build_pipeline(&settings).await?;
            let outcome = pipeline.run(date).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                process::exit(1);
            }
        }
        Command::Fetch => {
            let client = IndexApiClient::new(&settings.api)?;
            let first = client.build_request(1);
            let page = fetch_all(&client, first).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
        Command::Scrape => {
            let scraper = WebDriverScraper::new(settings.scrape.clone());
            let outcome = scraper.scrape().await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                process::exit(1);
            }
        }
    }

    Ok(())
}

async fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    let bucket = settings.require_bucket()?;
    let scraper = Arc::new(WebDriverScraper::new(settings.scrape.clone()));
    let fetcher = Arc::new(IndexApiClient::new(&settings.api)?);
    let writer = ArtifactWriter::new(settings.storage.temp_dir());
    let uploader = Arc::new(S3Uploader::from_env(bucket).await);
    Ok(Pipeline::new(scraper, fetcher, writer, uploader))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
