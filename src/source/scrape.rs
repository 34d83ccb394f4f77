// src/source/scrape.rs
//! WebDriver scraper for the rendered index page.
//!
//! The page is an Angular app with a client-side paginated table. The
//! scraper walks every page, re-reading the table after each transition.
//! Failures never escape as `Err`: `scrape` folds them into a soft
//! [`ScrapeOutcome`] so the orchestrator can fall back to the structured
//! endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::config::ScrapeSettings;

pub const TARGET_URL: &str =
    "https://sistemaswebb3-listados.b3.com.br/indexPage/day/IBOV?language=pt-br";

// DOM contract with the public page. Version-fragile by nature: a silent
// markup change breaks these selectors.
const TABLE: &str = "table.table.table-responsive-sm.table-responsive-md";
const ROWS: &str = "table.table.table-responsive-sm.table-responsive-md > tbody > tr";
const CELLS: &str = "td";
const FIRST_CELL: &str =
    "table.table.table-responsive-sm.table-responsive-md > tbody > tr:nth-child(1) > td:nth-child(1)";
const PAGER: &str = "ul.ngx-pagination > li.small-screen";
const NEXT_BUTTON: &str = "ul.ngx-pagination > li.pagination-next > a";
const DATE_LABEL: &str = "form.ng-untouched.ng-pristine.ng-valid > h2";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("webdriver session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),
    #[error("webdriver command: {0}")]
    Command(#[from] fantoccini::error::CmdError),
    #[error("pager text {0:?} is not in \"current / total\" form")]
    PagerFormat(String),
    #[error("heading {0:?} carries no date part")]
    DateLabel(String),
    #[error("page transition still pending after {0:?}")]
    Transition(Duration),
}

/// Soft result of one scrape. Failure is data, not control flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeOutcome {
    pub success: bool,
    pub message: String,
    pub rows: Option<Vec<Vec<String>>>,
    pub total_rows: usize,
    pub date_label: String,
}

impl ScrapeOutcome {
    pub fn completed(rows: Vec<Vec<String>>, date_label: String) -> Self {
        let total_rows = rows.len();
        Self {
            success: true,
            message: "ok".to_string(),
            rows: Some(rows),
            total_rows,
            date_label,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            rows: None,
            total_rows: 0,
            date_label: String::new(),
        }
    }
}

/// Injectable scraping seam so the orchestrator can run against fakes.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self) -> ScrapeOutcome;
    fn name(&self) -> &'static str;
}

/// Parse the pager counter text ("1 / 5") into (current, total).
pub fn parse_pager(text: &str) -> Result<(u32, u32), ScrapeError> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\s*$").unwrap());
    let caps = re
        .captures(text)
        .ok_or_else(|| ScrapeError::PagerFormat(text.to_string()))?;
    let current = caps[1]
        .parse()
        .map_err(|_| ScrapeError::PagerFormat(text.to_string()))?;
    let total = caps[2]
        .parse()
        .map_err(|_| ScrapeError::PagerFormat(text.to_string()))?;
    Ok((current, total))
}

/// Take the date part of the page heading, the segment after the hyphen:
/// "Carteira Teórica do IBOV - 22/08/25" becomes "22/08/25".
pub fn extract_date_label(text: &str) -> Result<String, ScrapeError> {
    match text.split('-').nth(1) {
        Some(date) if !date.trim().is_empty() => Ok(date.trim().to_string()),
        _ => Err(ScrapeError::DateLabel(text.to_string())),
    }
}

/// Scrapes the index page through a WebDriver session (headless Chrome by
/// default). One isolated session per call.
pub struct WebDriverScraper {
    settings: ScrapeSettings,
}

impl WebDriverScraper {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self { settings }
    }

    async fn connect(&self) -> Result<Client, ScrapeError> {
        let mut caps = serde_json::map::Map::new();
        if self.settings.headless {
            caps.insert(
                "goog:chromeOptions".to_string(),
                serde_json::json!({
                    "args": ["--headless", "--disable-gpu", "--no-sandbox", "--window-size=1920,1080"]
                }),
            );
        }
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&self.settings.webdriver_url)
            .await?;
        Ok(client)
    }

    /// The session is closed whatever the page walk returned.
    async fn run_session(&self) -> Result<(Vec<Vec<String>>, String), ScrapeError> {
        let client = self.connect().await?;
        let walked = self.walk_pages(&client).await;
        if let Err(e) = client.close().await {
            tracing::warn!(error = ?e, "closing webdriver session");
        }
        walked
    }

    async fn walk_pages(&self, client: &Client) -> Result<(Vec<Vec<String>>, String), ScrapeError> {
        client.goto(&self.settings.target_url).await?;
        client
            .wait()
            .at_most(Duration::from_secs(self.settings.table_wait_secs))
            .every(Duration::from_millis(self.settings.poll_interval_ms))
            .for_element(Locator::Css(TABLE))
            .await?;

        let pager_text = client.find(Locator::Css(PAGER)).await?.text().await?;
        let (_, last_page) = parse_pager(&pager_text)?;
        let heading = client.find(Locator::Css(DATE_LABEL)).await?.text().await?;
        let date_label = extract_date_label(&heading)?;

        let mut rows: Vec<Vec<String>> = Vec::new();
        loop {
            // Cell order and row order are preserved as rendered.
            for row in client.find_all(Locator::Css(ROWS)).await? {
                let mut cells = Vec::new();
                for cell in row.find_all(Locator::Css(CELLS)).await? {
                    cells.push(cell.text().await?.trim().to_string());
                }
                rows.push(cells);
            }

            let pager_text = client.find(Locator::Css(PAGER)).await?.text().await?;
            let (current, _) = parse_pager(&pager_text)?;
            if current >= last_page {
                break;
            }

            let sentinel = first_cell_text(client).await?;
            client.find(Locator::Css(NEXT_BUTTON)).await?.click().await?;
            self.wait_for_transition(client, &sentinel).await?;
        }

        Ok((rows, date_label))
    }

    /// Page-transition sync: the table re-renders asynchronously after the
    /// click, so poll the first cell until its text diverges from the
    /// sentinel captured before the click. Bounded wait, never a fixed
    /// sleep.
    async fn wait_for_transition(&self, client: &Client, sentinel: &str) -> Result<(), ScrapeError> {
        let timeout = Duration::from_millis(self.settings.transition_timeout_ms);
        let deadline = Instant::now() + timeout;
        loop {
            match first_cell_text(client).await {
                Ok(text) if text != sentinel => return Ok(()),
                // Same text, or a mid-render DOM with the cell missing:
                // keep polling until the deadline.
                Ok(_) | Err(_) => {}
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::Transition(timeout));
            }
            tokio::time::sleep(Duration::from_millis(self.settings.poll_interval_ms)).await;
        }
    }
}

async fn first_cell_text(client: &Client) -> Result<String, ScrapeError> {
    let text = client.find(Locator::Css(FIRST_CELL)).await?.text().await?;
    Ok(text.trim().to_string())
}

#[async_trait]
impl PageScraper for WebDriverScraper {
    async fn scrape(&self) -> ScrapeOutcome {
        match self.run_session().await {
            Ok((rows, date_label)) => ScrapeOutcome::completed(rows, date_label),
            Err(e) => ScrapeOutcome::failed(e.to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "web-scrape"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pager_parses_current_and_total() {
        assert_eq!(parse_pager("1 / 5").unwrap(), (1, 5));
        assert_eq!(parse_pager("12/15").unwrap(), (12, 15));
        assert_eq!(parse_pager("  3 /  7 ").unwrap(), (3, 7));
    }

    #[test]
    fn pager_rejects_other_shapes() {
        assert!(parse_pager("").is_err());
        assert!(parse_pager("1 de 5").is_err());
        assert!(parse_pager("1 / 5 / 9").is_err());
        assert!(parse_pager("page 2").is_err());
    }

    #[test]
    fn date_label_takes_the_part_after_the_hyphen() {
        assert_eq!(
            extract_date_label("Carteira Teórica do IBOV - 22/08/25").unwrap(),
            "22/08/25"
        );
        assert_eq!(extract_date_label("IBOV - 01/02/24 ").unwrap(), "01/02/24");
    }

    #[test]
    fn date_label_without_hyphen_is_an_error() {
        assert!(extract_date_label("Carteira Teórica do IBOV").is_err());
        assert!(extract_date_label("IBOV -   ").is_err());
    }

    #[test]
    fn failed_outcome_carries_the_message_and_no_rows() {
        let out = ScrapeOutcome::failed("pager text \"x\" is not usable");
        assert!(!out.success);
        assert_eq!(out.total_rows, 0);
        assert!(out.rows.is_none());
        assert!(out.date_label.is_empty());
    }

    #[test]
    fn completed_outcome_counts_rows() {
        let rows = vec![vec!["PETR4".to_string()], vec!["VALE3".to_string()]];
        let out = ScrapeOutcome::completed(rows, "22/08/25".to_string());
        assert!(out.success);
        assert_eq!(out.total_rows, 2);
        assert_eq!(out.rows.as_ref().map(Vec::len), Some(2));
    }
}
