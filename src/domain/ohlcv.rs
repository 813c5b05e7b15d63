//! Daily OHLCV bars and stored market data rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// A bar as persisted in the market data table, keyed by (symbol, date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketData {
    pub id: i64,
    #[serde(flatten)]
    pub bar: OhlcvBar,
}

/// Closing prices in the order the bars are given.
pub fn closes(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
