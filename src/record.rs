// src/record.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Canonical trade record both sources converge to. Records exist only for
/// the duration of one pipeline run and are persisted solely as rows of the
/// Parquet artifact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TradeRecord {
    pub trade_date: NaiveDate,
    /// Never empty; rows without a usable ticker are skipped upstream.
    pub ticker: String,
    /// Zero when the source text failed to parse.
    pub price: Decimal,
    /// Zero when the source text failed to parse.
    pub quantity: i64,
}
