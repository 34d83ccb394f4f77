// tests/normalize_rows.rs
//! Conversion rules as visible through the public surface: which raw rows
//! become records, which are skipped, and with what reason.

use b3_daily_pipeline::normalize::{from_api_items, from_scraped_rows, RowSkip, MISSING_TICKER};
use b3_daily_pipeline::source::api::IndexEntry;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn trade_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
}

fn row(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn entry(cod: Option<&str>, part: &str, qty: &str) -> IndexEntry {
    IndexEntry {
        segment: None,
        cod: cod.map(str::to_string),
        asset: "ASSET".to_string(),
        asset_type: "ON".to_string(),
        part: part.to_string(),
        part_acum: None,
        theorical_qty: qty.to_string(),
    }
}

#[test]
fn scraped_rows_become_canonical_records() {
    let rows = vec![row(&["PETR4", "PETROBRAS", "PN N2", "6,693", "456.431.124"])];

    let out = from_scraped_rows(&rows, trade_date());

    assert!(out.skips.is_empty());
    assert_eq!(out.records.len(), 1);
    let record = &out.records[0];
    assert_eq!(record.ticker, "PETR4");
    assert_eq!(record.price, dec!(6.693));
    assert_eq!(record.quantity, 456_431_124);
    assert_eq!(record.trade_date, trade_date());
}

#[test]
fn blank_ticker_drops_exactly_one_row() {
    let rows = vec![
        row(&["PETR4", "x", "1,0", "10"]),
        row(&["   ", "x", "2,0", "20"]),
        row(&["VALE3", "x", "3,0", "30"]),
    ];

    let out = from_scraped_rows(&rows, trade_date());

    assert_eq!(out.records.len(), 2);
    assert_eq!(out.skips, vec![RowSkip::EmptyTicker { row: 1 }]);
    let tickers: Vec<_> = out.records.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["PETR4", "VALE3"]);
}

#[test]
fn short_rows_are_counted_with_their_size() {
    let rows = vec![row(&["PETR4"]), row(&[])];

    let out = from_scraped_rows(&rows, trade_date());

    assert!(out.records.is_empty());
    assert_eq!(
        out.skips,
        vec![
            RowSkip::TooFewCells { row: 0, cells: 1 },
            RowSkip::TooFewCells { row: 1, cells: 0 },
        ]
    );
}

#[test]
fn unparsable_values_default_to_zero() {
    let rows = vec![row(&["XPTO3", "texto", "mais texto"])];

    let out = from_scraped_rows(&rows, trade_date());

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].price, Decimal::ZERO);
    assert_eq!(out.records[0].quantity, 0);
}

#[test]
fn skips_never_abort_the_batch() {
    let rows = vec![
        row(&["PETR4", "x", "1,0", "10"]),
        row(&["lonely"]),
        row(&["", "x", "2,0", "20"]),
        row(&["VALE3", "x", "3,0", "30"]),
    ];

    let out = from_scraped_rows(&rows, trade_date());

    assert_eq!(out.records.len(), 2);
    assert_eq!(out.skips.len(), 2);
}

#[test]
fn api_items_map_the_named_fields() {
    let items = vec![entry(Some("PETR4"), "6,693", "456.431.124")];

    let out = from_api_items(&items, trade_date());

    assert!(out.skips.is_empty());
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].ticker, "PETR4");
    assert_eq!(out.records[0].price, dec!(6.693));
    assert_eq!(out.records[0].quantity, 456_431_124);
}

#[test]
fn missing_or_blank_cod_keeps_the_sentinel_ticker() {
    let items = vec![
        entry(None, "1,0", "10"),
        entry(Some("   "), "2,0", "20"),
        entry(Some("ITUB4"), "3,0", "30"),
    ];

    let out = from_api_items(&items, trade_date());

    assert!(out.skips.is_empty());
    let tickers: Vec<_> = out.records.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec![MISSING_TICKER, MISSING_TICKER, "ITUB4"]);
}
