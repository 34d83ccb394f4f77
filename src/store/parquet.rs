// src/store/parquet.rs
//! Parquet serialization of one run's records.

use std::fs::{self, File};
use std::path::PathBuf;

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::prelude::ToPrimitive;

use super::StoreError;
use crate::record::TradeRecord;

/// Deterministic artifact name for a partition date: `b3_<YYYYMMDD>.parquet`.
pub fn artifact_file_name(partition: NaiveDate) -> String {
    format!("b3_{}.parquet", partition.format("%Y%m%d"))
}

/// Writes a record batch as a single Parquet file in the configured
/// temporary directory (created if absent).
pub struct ArtifactWriter {
    temp_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// One pass, no partial-write recovery: an error here aborts the run
    /// and may leave a truncated file behind.
    pub fn write(
        &self,
        records: &[TradeRecord],
        partition: NaiveDate,
    ) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.temp_dir)?;
        let path = self.temp_dir.join(artifact_file_name(partition));
        let mut df = records_to_dataframe(records)?;
        let file = File::create(&path)?;
        ParquetWriter::new(file).finish(&mut df)?;
        Ok(path)
    }
}

/// Columns: `trade_date` (Date), `ticker` (String), `price` (Float64,
/// narrowed from Decimal), `quantity` (Int64).
fn records_to_dataframe(records: &[TradeRecord]) -> Result<DataFrame, StoreError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.trade_date - epoch).num_days() as i32)
        .collect();
    let tickers: Vec<String> = records.iter().map(|r| r.ticker.clone()).collect();
    let prices: Vec<f64> = records
        .iter()
        .map(|r| r.price.to_f64().unwrap_or(0.0))
        .collect();
    let quantities: Vec<i64> = records.iter().map(|r| r.quantity).collect();

    let df = DataFrame::new(vec![
        Column::new("trade_date".into(), dates).cast(&DataType::Date)?,
        Column::new("ticker".into(), tickers),
        Column::new("price".into(), prices),
        Column::new("quantity".into(), quantities),
    ])?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(ticker: &str, price: Decimal, quantity: i64) -> TradeRecord {
        TradeRecord {
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ticker: ticker.to_string(),
            price,
            quantity,
        }
    }

    #[test]
    fn file_name_encodes_the_partition_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(artifact_file_name(date), "b3_20240102.parquet");
    }

    #[test]
    fn writes_and_reads_back_the_expected_schema() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let records = vec![
            record("PETR4", dec!(6.693), 456_431_124),
            record("VALE3", dec!(0.0), 0),
        ];

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let path = writer.write(&records, date).unwrap();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("b3_20240102.parquet")
        );

        let df = ParquetReader::new(File::open(&path).unwrap())
            .finish()
            .unwrap();
        assert_eq!(df.height(), 2);
        for col in ["trade_date", "ticker", "price", "quantity"] {
            assert!(df.column(col).is_ok(), "missing column {col}");
        }
        assert_eq!(df.column("trade_date").unwrap().dtype(), &DataType::Date);
        assert_eq!(df.column("quantity").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn creates_the_temp_dir_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("artifacts/daily");
        let writer = ArtifactWriter::new(&nested);
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let path = writer.write(&[record("BBAS3", dec!(1.1), 5)], date).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
