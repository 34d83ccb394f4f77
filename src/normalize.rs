// src/normalize.rs
//! Conversion of raw source shapes into canonical trade records.
//!
//! Pure and side-effect free: per-row problems become [`RowSkip`] values in
//! the returned bundle instead of log lines or aborts. The caller owns the
//! diagnostics, and tests can count skip causes.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::numeric::{parse_decimal, parse_integer};
use crate::record::TradeRecord;
use crate::source::api::IndexEntry;

/// Version of the scraped-table layout inference below. Bump when the
/// inference rules change.
pub const LAYOUT_VERSION: u32 = 1;

/// Ticker used when an item carries no code.
pub const MISSING_TICKER: &str = "N/A";

/// Why a raw row produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSkip {
    /// Fewer than two cells: no room for a ticker plus any value.
    TooFewCells { row: usize, cells: usize },
    /// First cell blank after trimming; a record must have a ticker.
    EmptyTicker { row: usize },
}

/// Conversion result: the records plus enumerable skip reasons.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<TradeRecord>,
    pub skips: Vec<RowSkip>,
}

/// Value-column positions inferred for one scraped row (layout v1). Cells
/// after the ticker are scanned left-to-right: the first parsing to a
/// non-zero decimal is the price column, the first after that parsing to a
/// non-zero integer is the quantity column. The page table declares no
/// schema, so positions are inferred, never assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub price: Option<usize>,
    pub quantity: Option<usize>,
}

impl ColumnMap {
    pub fn infer(cells: &[String]) -> Self {
        let mut price = None;
        let mut quantity = None;
        for (idx, cell) in cells.iter().enumerate().skip(1) {
            if price.is_none() && parse_decimal(cell) != Decimal::ZERO {
                price = Some(idx);
            } else if price.is_some() && quantity.is_none() && parse_integer(cell) != 0 {
                quantity = Some(idx);
            }
            if price.is_some() && quantity.is_some() {
                break;
            }
        }
        Self { price, quantity }
    }
}

/// Convert scraped table rows for `trade_date`. Rows that cannot yield a
/// ticker are skipped, never fatal; missing value columns leave price or
/// quantity at zero.
pub fn from_scraped_rows(rows: &[Vec<String>], trade_date: NaiveDate) -> Normalized {
    let mut out = Normalized::default();
    for (idx, cells) in rows.iter().enumerate() {
        if cells.len() < 2 {
            out.skips.push(RowSkip::TooFewCells {
                row: idx,
                cells: cells.len(),
            });
            continue;
        }
        let ticker = cells[0].trim();
        if ticker.is_empty() {
            out.skips.push(RowSkip::EmptyTicker { row: idx });
            continue;
        }

        let map = ColumnMap::infer(cells);
        let price = map
            .price
            .map(|i| parse_decimal(&cells[i]))
            .unwrap_or(Decimal::ZERO);
        let quantity = map.quantity.map(|i| parse_integer(&cells[i])).unwrap_or(0);

        out.records.push(TradeRecord {
            trade_date,
            ticker: ticker.to_string(),
            price,
            quantity,
        });
    }
    out
}

/// Convert structured API items for `trade_date`. An item whose `cod` is
/// absent or blank keeps the sentinel ticker instead of being dropped.
pub fn from_api_items(items: &[IndexEntry], trade_date: NaiveDate) -> Normalized {
    let mut out = Normalized::default();
    for item in items {
        let ticker = match item.cod.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => MISSING_TICKER.to_string(),
        };
        out.records.push(TradeRecord {
            trade_date,
            ticker,
            price: parse_decimal(&item.part),
            quantity: parse_integer(&item.theorical_qty),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn infers_price_then_quantity_left_to_right() {
        let row = cells(&["PETR4", "PETROBRAS", "PN N2", "6,693", "456.431.124"]);
        let map = ColumnMap::infer(&row);
        assert_eq!(map.price, Some(3));
        assert_eq!(map.quantity, Some(4));
    }

    #[test]
    fn price_cell_is_not_reused_as_quantity() {
        // "3,14" also parses as the integer 314, but the quantity column
        // must come after the price column.
        let row = cells(&["ITUB4", "desc", "3,14"]);
        let map = ColumnMap::infer(&row);
        assert_eq!(map.price, Some(2));
        assert_eq!(map.quantity, None);
    }

    #[test]
    fn any_numeric_cell_can_become_the_price() {
        // Integers parse as decimals too, so a bare count ahead of the
        // percentage column wins the price slot.
        let row = cells(&["VALE3", "889", "1,5"]);
        let map = ColumnMap::infer(&row);
        assert_eq!(map.price, Some(1));
        assert_eq!(map.quantity, Some(2));
    }

    #[test]
    fn columns_may_be_missing() {
        let row = cells(&["ABEV3", "only", "words"]);
        let map = ColumnMap::infer(&row);
        assert_eq!(map.price, None);
        assert_eq!(map.quantity, None);
    }
}
