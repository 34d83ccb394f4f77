// src/numeric.rs
//! Locale-aware numeric parsing for pt-BR formatted source text.
//!
//! Both sources deliver numbers as text ("R$ 1.234,56", "2,097%",
//! "1.234.567"). These helpers strip the locale decoration and parse;
//! anything unparsable becomes zero, so a zero result is indistinguishable
//! from a true zero value. That lossy default is deliberate and preserved.

use rust_decimal::Decimal;

/// Parse decimal text with pt-BR separators and optional currency/percent
/// markers. Returns zero for empty or malformed input.
pub fn parse_decimal(text: &str) -> Decimal {
    let cleaned = text
        .trim()
        .replace("R$", "")
        .replace('%', "")
        .replace('.', "")
        .replace(',', ".");
    cleaned.trim().parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Parse integer text with pt-BR grouping separators. Returns zero for
/// empty or malformed input. Markers like "%" are not stripped here: a
/// percentage cell must not read as a plain integer.
pub fn parse_integer(text: &str) -> i64 {
    let cleaned = text.trim().replace(['.', ','], "");
    cleaned.trim().parse::<i64>().unwrap_or(0)
}
