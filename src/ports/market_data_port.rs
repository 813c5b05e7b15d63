//! Live market data source port (brokerage data API).

use crate::domain::error::QuantfolioError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait MarketDataSource {
    /// Daily bars between `start` and `end` inclusive, in ascending date order.
    fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QuantfolioError>;

    /// Price of the most recent trade.
    fn latest_price(&self, symbol: &str) -> Result<f64, QuantfolioError>;
}
