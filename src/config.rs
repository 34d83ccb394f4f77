// src/config.rs
//! Layered runtime settings: environment > TOML file > built-in defaults.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::source::api::{
    DEFAULT_INDEX, DEFAULT_LANGUAGE, DEFAULT_PAGE_SIZE, DEFAULT_SEGMENT, PORTFOLIO_DAY_URL,
};
use crate::source::scrape::TARGET_URL;

const ENV_CONFIG_PATH: &str = "B3_PIPELINE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub scrape: ScrapeSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub language: String,
    pub index: String,
    pub segment: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: PORTFOLIO_DAY_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            index: DEFAULT_INDEX.to_string(),
            segment: DEFAULT_SEGMENT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub target_url: String,
    pub webdriver_url: String,
    pub headless: bool,
    /// Upper bound on waiting for the table to render after navigation.
    pub table_wait_secs: u64,
    /// Upper bound on one pager transition (sentinel divergence).
    pub transition_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            target_url: TARGET_URL.to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            table_wait_secs: 30,
            transition_timeout_ms: 5_000,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for the temporary artifact; system temp when unset.
    pub temp_dir: Option<PathBuf>,
    /// Target bucket; required for the full pipeline, not for fetch/scrape.
    pub s3_bucket: Option<String>,
}

impl StorageSettings {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Settings {
    /// Load from an explicit TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let mut settings: Settings =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load using the fallback chain:
    /// 1) $B3_PIPELINE_CONFIG
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    /// Individual B3_* variables override file values either way.
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::from_file(&pb);
            }
            bail!("B3_PIPELINE_CONFIG points to a non-existent path");
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::from_file(&default);
        }
        let mut settings = Settings::default();
        settings.apply_env();
        Ok(settings)
    }

    /// Environment overrides for the values that differ per deployment.
    fn apply_env(&mut self) {
        if let Ok(bucket) = std::env::var("B3_S3_BUCKET") {
            if !bucket.trim().is_empty() {
                self.storage.s3_bucket = Some(bucket);
            }
        }
        if let Ok(dir) = std::env::var("B3_TEMP_DIR") {
            if !dir.trim().is_empty() {
                self.storage.temp_dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(url) = std::env::var("B3_WEBDRIVER_URL") {
            if !url.trim().is_empty() {
                self.scrape.webdriver_url = url;
            }
        }
    }

    /// The bucket is mandatory for the full pipeline; fail fast when it is
    /// missing instead of failing mid-run at upload time.
    pub fn require_bucket(&self) -> Result<String> {
        self.storage
            .s3_bucket
            .clone()
            .context("no S3 bucket configured (set B3_S3_BUCKET or [storage] s3_bucket)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn defaults_cover_every_section() {
        let s = Settings::default();
        assert_eq!(s.api.index, "IBOV");
        assert_eq!(s.api.page_size, 99_999);
        assert_eq!(s.scrape.webdriver_url, "http://localhost:4444");
        assert!(s.scrape.headless);
        assert!(s.storage.s3_bucket.is_none());
        assert!(s.require_bucket().is_err());
    }

    #[test]
    fn file_values_override_defaults() {
        let toml = r#"
            [api]
            index = "IBXX"
            page_size = 500

            [scrape]
            transition_timeout_ms = 9000

            [storage]
            s3_bucket = "market-raw"
        "#;
        let s: Settings = toml::from_str(toml).unwrap();
        assert_eq!(s.api.index, "IBXX");
        assert_eq!(s.api.page_size, 500);
        assert_eq!(s.api.language, "pt-br");
        assert_eq!(s.scrape.transition_timeout_ms, 9000);
        assert_eq!(s.require_bucket().unwrap(), "market-raw");
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_file_and_defaults() {
        env::set_var("B3_S3_BUCKET", "bucket-from-env");
        env::set_var("B3_WEBDRIVER_URL", "http://driver:9515");
        env::remove_var("B3_TEMP_DIR");

        let mut s = Settings::default();
        s.storage.s3_bucket = Some("bucket-from-file".to_string());
        s.apply_env();

        assert_eq!(s.require_bucket().unwrap(), "bucket-from-env");
        assert_eq!(s.scrape.webdriver_url, "http://driver:9515");

        env::remove_var("B3_S3_BUCKET");
        env::remove_var("B3_WEBDRIVER_URL");
    }
}
