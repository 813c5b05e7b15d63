//! Persistence port for portfolios, investments, strategies, trades and
//! market data.

use crate::domain::error::QuantfolioError;
use crate::domain::investment::{Investment, NewInvestment};
use crate::domain::ohlcv::{MarketData, OhlcvBar};
use crate::domain::portfolio::{NewPortfolio, Portfolio, PortfolioDetail, PortfolioSummary};
use crate::domain::strategy::{ModelParameters, NewStrategy, TradingStrategy};
use crate::domain::trade::{NewTrade, Trade, TradeFilter};

pub trait StorePort {
    fn create_portfolio(&self, input: &NewPortfolio) -> Result<Portfolio, QuantfolioError>;
    fn get_portfolio(&self, id: i64) -> Result<Option<Portfolio>, QuantfolioError>;
    fn list_portfolios(&self) -> Result<Vec<Portfolio>, QuantfolioError>;
    /// Removes the portfolio with its investments, strategies and trades.
    /// Returns false when nothing was deleted.
    fn delete_portfolio(&self, id: i64) -> Result<bool, QuantfolioError>;
    /// Sum of current values of the portfolio's investments.
    fn portfolio_value(&self, id: i64) -> Result<f64, QuantfolioError>;

    fn add_investment(
        &self,
        portfolio_id: i64,
        input: &NewInvestment,
    ) -> Result<Investment, QuantfolioError>;
    fn get_investment(&self, id: i64) -> Result<Option<Investment>, QuantfolioError>;
    fn list_investments(&self, portfolio_id: i64) -> Result<Vec<Investment>, QuantfolioError>;
    fn update_investment_price(
        &self,
        id: i64,
        price: f64,
    ) -> Result<Option<Investment>, QuantfolioError>;
    fn delete_investment(&self, id: i64) -> Result<bool, QuantfolioError>;

    fn create_strategy(&self, input: &NewStrategy) -> Result<TradingStrategy, QuantfolioError>;
    fn get_strategy(&self, id: i64) -> Result<Option<TradingStrategy>, QuantfolioError>;
    fn list_strategies(
        &self,
        portfolio_id: Option<i64>,
    ) -> Result<Vec<TradingStrategy>, QuantfolioError>;
    fn update_strategy_model(
        &self,
        id: i64,
        params: &ModelParameters,
    ) -> Result<(), QuantfolioError>;

    /// Books the trade and bumps the strategy's counters atomically.
    fn record_trade(&self, trade: &NewTrade, winning: bool) -> Result<Trade, QuantfolioError>;
    /// Most recent first.
    fn list_trades(
        &self,
        filter: TradeFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Trade>, QuantfolioError>;

    /// Inserts bars, replacing any existing row for the same (symbol, date).
    fn upsert_market_data(&self, bars: &[OhlcvBar]) -> Result<usize, QuantfolioError>;
    /// The latest `limit` bars for a symbol, in ascending date order.
    fn recent_market_data(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<OhlcvBar>, QuantfolioError>;
    /// Stored rows, newest first, optionally restricted to one symbol.
    fn list_market_data(
        &self,
        symbol: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MarketData>, QuantfolioError>;
    fn latest_close(&self, symbol: &str) -> Result<Option<f64>, QuantfolioError>;

    fn portfolio_summaries(&self) -> Result<Vec<PortfolioSummary>, QuantfolioError> {
        self.list_portfolios()?
            .into_iter()
            .map(|p| {
                let investments = self.list_investments(p.id)?;
                Ok(PortfolioSummary::new(p, &investments))
            })
            .collect()
    }

    fn portfolio_detail(&self, id: i64) -> Result<Option<PortfolioDetail>, QuantfolioError> {
        let Some(portfolio) = self.get_portfolio(id)? else {
            return Ok(None);
        };
        let investments = self.list_investments(id)?;
        Ok(Some(PortfolioDetail {
            summary: PortfolioSummary::new(portfolio, &investments),
            investments,
        }))
    }
}
