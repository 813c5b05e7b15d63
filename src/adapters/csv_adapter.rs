//! CSV market data import.
//!
//! Expects a header row followed by `date,open,high,low,close,volume`
//! records, dates formatted `%Y-%m-%d`.

use crate::domain::error::QuantfolioError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::validation::normalize_symbol;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record as a bar for `symbol`, sorted by date.
    pub fn read_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, QuantfolioError> {
        let symbol = normalize_symbol(symbol)?;
        let content = fs::read_to_string(&self.path)?;
        parse_bars(&symbol, &content)
    }
}

pub fn parse_bars(symbol: &str, content: &str) -> Result<Vec<OhlcvBar>, QuantfolioError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|e| {
            QuantfolioError::validation(format!("CSV parse error on line {line}: {e}"))
        })?;

        let date_str = field(&record, 0, "date", line)?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            QuantfolioError::validation(format!("invalid date '{date_str}' on line {line}: {e}"))
        })?;

        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            date,
            open: number(&record, 1, "open", line)?,
            high: number(&record, 2, "high", line)?,
            low: number(&record, 3, "low", line)?,
            close: number(&record, 4, "close", line)?,
            volume: field(&record, 5, "volume", line)?
                .parse::<f64>()
                .map(|v| v.round() as i64)
                .map_err(|e| {
                    QuantfolioError::validation(format!("invalid volume on line {line}: {e}"))
                })?,
        });
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

fn field<'r>(
    record: &'r StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<&'r str, QuantfolioError> {
    record
        .get(idx)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| QuantfolioError::validation(format!("missing {name} column on line {line}")))
}

fn number(
    record: &StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<f64, QuantfolioError> {
    field(record, idx, name, line)?
        .parse()
        .map_err(|e| QuantfolioError::validation(format!("invalid {name} value on line {line}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "date,open,high,low,close,volume
2024-01-03,101.0,103.0,100.0,102.5,1200
2024-01-02,100.0,102.0,99.0,101.0,1000
";

    #[test]
    fn parses_and_sorts_by_date() {
        let bars = parse_bars("AAPL", SAMPLE).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 101.0);
        assert_eq!(bars[1].volume, 1200);
        assert!(bars.iter().all(|b| b.symbol == "AAPL"));
    }

    #[test]
    fn fractional_volume_is_rounded() {
        let bars = parse_bars("AAPL", "date,open,high,low,close,volume\n2024-01-02,1,2,1,2,10.6\n")
            .unwrap();
        assert_eq!(bars[0].volume, 11);
    }

    #[test]
    fn bad_date_reports_line() {
        let err = parse_bars("AAPL", "date,open,high,low,close,volume\n02/01/2024,1,2,1,2,10\n")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn missing_column_is_rejected() {
        let result = parse_bars("AAPL", "date,open,high,low,close,volume\n2024-01-02,1,2,1,2,\n");
        assert!(matches!(result, Err(QuantfolioError::Validation { .. })));
    }

    #[test]
    fn read_bars_normalizes_symbol() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let adapter = CsvAdapter::new(file.path());
        let bars = adapter.read_bars(" msft ").unwrap();
        assert_eq!(bars[0].symbol, "MSFT");
    }

    #[test]
    fn missing_file_is_io_error() {
        let adapter = CsvAdapter::new("/nonexistent/bars.csv");
        assert!(matches!(
            adapter.read_bars("AAPL"),
            Err(QuantfolioError::Io(_))
        ));
    }
}
