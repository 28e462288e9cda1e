//! CSV file data adapter.
//!
//! One file per symbol at `<base_path>/<SYMBOL>.csv` with the header
//! `date,adj_close,volume` and `YYYY-MM-DD` dates.

use crate::domain::error::EwatraderError;
use crate::domain::price_bar::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

const EXTENSION: &str = "csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.{}", symbol, EXTENSION))
    }

    /// Every bar in the symbol's file, sorted by date.
    fn read_all(&self, symbol: &str) -> Result<Vec<PriceBar>, EwatraderError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(EwatraderError::NoData {
                code: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| EwatraderError::DataAccess {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| EwatraderError::DataAccess {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            // header is line 1
            let row = line + 2;

            let date_str = record.get(0).ok_or_else(|| EwatraderError::DataAccess {
                reason: format!("{}:{}: missing date column", symbol, row),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                EwatraderError::DataAccess {
                    reason: format!("{}:{}: invalid date {:?}: {}", symbol, row, date_str, e),
                }
            })?;

            let close_str = record.get(1).ok_or_else(|| EwatraderError::DataAccess {
                reason: format!("{}:{}: missing adj_close column", symbol, row),
            })?;
            let adjusted_close =
                Decimal::from_str(close_str).map_err(|e| EwatraderError::DataAccess {
                    reason: format!("{}:{}: invalid adj_close {:?}: {}", symbol, row, close_str, e),
                })?;

            let volume: u64 = record
                .get(2)
                .ok_or_else(|| EwatraderError::DataAccess {
                    reason: format!("{}:{}: missing volume column", symbol, row),
                })?
                .parse()
                .map_err(|e| EwatraderError::DataAccess {
                    reason: format!("{}:{}: invalid volume: {}", symbol, row, e),
                })?;

            bars.push(PriceBar::new(date, adjusted_close, volume));
        }

        bars.sort_by_key(|b| b.date);
        debug!("Read {} bars from {}", bars.len(), path.display());
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, EwatraderError> {
        let mut bars = self.read_all(symbol)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EwatraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| EwatraderError::DataAccess {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EwatraderError::DataAccess {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EwatraderError> {
        if !self.csv_path(symbol).exists() {
            return Ok(None);
        }
        let bars = self.read_all(symbol)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // deliberately out of order
        let csv_content = "date,adj_close,volume\n\
            2024-01-17,115.25,550000\n\
            2024-01-15,105.00,500000\n\
            2024-01-16,110.10,600000\n";

        fs::write(path.join("AAPL.csv"), csv_content).unwrap();
        fs::write(path.join("EMPTY.csv"), "date,adj_close,volume\n").unwrap();
        fs::write(path.join("BAD.csv"), "date,adj_close,volume\n2024-01-15,abc,10\n").unwrap();
        fs::write(path.join("notes.txt"), "ignored").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_prices_sorted_and_exact() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_prices("AAPL", date(1), date(31)).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, date(15));
        assert_eq!(bars[0].adjusted_close, Decimal::from_str("105.00").unwrap());
        assert_eq!(bars[1].adjusted_close, Decimal::from_str("110.10").unwrap());
        assert_eq!(bars[2].date, date(17));
        assert_eq!(bars[2].volume, 550_000);
    }

    #[test]
    fn fetch_prices_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_prices("AAPL", date(16), date(16)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date(16));
    }

    #[test]
    fn fetch_prices_missing_file_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_prices("XYZ", date(1), date(31));
        assert!(matches!(result, Err(EwatraderError::NoData { code }) if code == "XYZ"));
    }

    #[test]
    fn fetch_prices_bad_value_is_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_prices("BAD", date(1), date(31)).unwrap_err();
        assert!(err.to_string().contains("adj_close"));
    }

    #[test]
    fn list_symbols_only_csv() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["AAPL", "BAD", "EMPTY"]);
    }

    #[test]
    fn list_symbols_missing_dir_is_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/ewatrader/data"));
        assert!(adapter.list_symbols().is_err());
    }

    #[test]
    fn data_range() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.get_data_range("AAPL").unwrap(),
            Some((date(15), date(17), 3))
        );
        assert_eq!(adapter.get_data_range("EMPTY").unwrap(), None);
        assert_eq!(adapter.get_data_range("XYZ").unwrap(), None);
    }
}
