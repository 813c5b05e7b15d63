//! Signal generation and paper-trade execution pipeline.
//!
//! market data -> daily returns -> linear trend fit -> buy/sell/hold
//! -> position sizing -> trade booking.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::error::QuantfolioError;
use super::ohlcv::{closes, OhlcvBar};
use super::signal::{daily_returns, position_quantity, Signal, SignalModel, MIN_RETURN_OBSERVATIONS};
use super::strategy::{is_winning, TradingStrategy};
use super::trade::{NewTrade, Trade, TradeStatus};
use crate::ports::market_data_port::MarketDataSource;
use crate::ports::store_port::StorePort;

pub const DEFAULT_LOOKBACK_DAYS: usize = 100;
pub const MAX_LOOKBACK_DAYS: usize = 3650;
/// Price assumed when neither the broker nor the store knows the symbol.
pub const DEFAULT_PRICE: f64 = 100.0;

#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub signal: Signal,
    pub trade: Option<Trade>,
}

pub struct TradingService<'a> {
    store: &'a dyn StorePort,
    source: Option<&'a dyn MarketDataSource>,
    lookback_days: usize,
    today: NaiveDate,
}

impl<'a> TradingService<'a> {
    pub fn new(store: &'a dyn StorePort, source: Option<&'a dyn MarketDataSource>) -> Self {
        if source.is_none() {
            debug!("no market data source configured; using stored market data");
        }
        TradingService {
            store,
            source,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_lookback_days(mut self, days: usize) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Daily bars for the last `days`: from the broker when configured
    /// (persisting what it returns), otherwise the latest stored rows.
    pub fn fetch_market_data(
        &self,
        symbol: &str,
        days: usize,
    ) -> Result<Vec<OhlcvBar>, QuantfolioError> {
        let bars = match self.source {
            Some(source) => {
                let start = i64::try_from(days)
                    .ok()
                    .and_then(Duration::try_days)
                    .and_then(|span| self.today.checked_sub_signed(span))
                    .ok_or_else(|| {
                        QuantfolioError::validation(format!("lookback of {days} days is out of range"))
                    })?;
                let mut bars = source.daily_bars(symbol, start, self.today)?;
                bars.sort_by_key(|b| b.date);
                let stored = self.store.upsert_market_data(&bars)?;
                debug!(symbol, stored, "persisted broker market data");
                bars
            }
            None => self.store.recent_market_data(symbol, days)?,
        };

        if bars.is_empty() {
            return Err(QuantfolioError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    /// Fits the trend model, stamps its parameters on the strategy and
    /// decides what to do next.
    pub fn generate_signal(&self, strategy: &TradingStrategy) -> Result<Signal, QuantfolioError> {
        let bars = self.fetch_market_data(&strategy.symbol, self.lookback_days)?;
        let returns = daily_returns(&closes(&bars));

        let model =
            SignalModel::fit(&returns).ok_or_else(|| QuantfolioError::InsufficientData {
                symbol: strategy.symbol.clone(),
                observations: returns.len(),
                minimum: MIN_RETURN_OBSERVATIONS,
            })?;
        self.store
            .update_strategy_model(strategy.id, &model.parameters())?;

        let prediction = model.predict_next(returns.len());
        let signal = Signal::from_prediction(
            &strategy.symbol,
            prediction,
            strategy.confidence_threshold,
        );
        info!(
            strategy_id = strategy.id,
            symbol = %signal.symbol,
            action = %signal.action,
            predicted_return = signal.predicted_return,
            confidence = signal.confidence,
            "generated signal"
        );
        Ok(signal)
    }

    /// Latest broker trade price, else the latest stored close, else
    /// [`DEFAULT_PRICE`].
    pub fn current_price(&self, symbol: &str) -> Result<f64, QuantfolioError> {
        if let Some(source) = self.source {
            match source.latest_price(symbol) {
                Ok(price) if price > 0.0 => return Ok(price),
                Ok(price) => warn!(symbol, price, "ignoring non-positive broker price"),
                Err(e) => warn!(symbol, error = %e, "could not get latest trade, using stored close"),
            }
        }
        Ok(self
            .store
            .latest_close(symbol)?
            .filter(|p| *p > 0.0)
            .unwrap_or(DEFAULT_PRICE))
    }

    /// Books a filled paper trade for a buy or sell signal. Hold books nothing.
    pub fn execute_paper_trade(
        &self,
        strategy: &TradingStrategy,
        signal: &Signal,
    ) -> Result<Option<Trade>, QuantfolioError> {
        let Some(side) = signal.action.side() else {
            return Ok(None);
        };

        let price = self.current_price(&signal.symbol)?;
        let portfolio_value = self.store.portfolio_value(strategy.portfolio_id)?;
        let quantity = position_quantity(portfolio_value, strategy.position_size, price)?;
        if quantity == 0.0 {
            warn!(
                strategy_id = strategy.id,
                portfolio_id = strategy.portfolio_id,
                "portfolio has no value, booking zero-quantity trade"
            );
        }

        let new_trade = NewTrade {
            strategy_id: strategy.id,
            portfolio_id: strategy.portfolio_id,
            symbol: signal.symbol.clone(),
            side,
            quantity,
            price,
            status: TradeStatus::Filled,
            predicted_return: signal.predicted_return,
            confidence: signal.confidence,
        };
        let trade = self
            .store
            .record_trade(&new_trade, is_winning(side, signal.predicted_return))?;

        info!(
            trade_id = trade.id,
            side = %trade.side,
            symbol = %trade.symbol,
            quantity = trade.quantity,
            price = trade.price,
            "executed paper trade"
        );
        Ok(Some(trade))
    }

    /// Runs the whole pipeline for one strategy.
    ///
    /// An unknown strategy is an error. An inactive strategy or any failure
    /// while generating the signal yields `Ok(None)`; a failed execution
    /// yields the signal without a trade.
    pub fn run_strategy(&self, strategy_id: i64) -> Result<Option<StrategyRun>, QuantfolioError> {
        let strategy =
            self.store
                .get_strategy(strategy_id)?
                .ok_or(QuantfolioError::NotFound {
                    entity: "strategy",
                    id: strategy_id,
                })?;

        if !strategy.is_active {
            info!(strategy_id, "strategy is inactive, skipping");
            return Ok(None);
        }

        let signal = match self.generate_signal(&strategy) {
            Ok(signal) => signal,
            Err(e) => {
                error!(strategy_id, symbol = %strategy.symbol, error = %e, "error generating trading signal");
                return Ok(None);
            }
        };

        let trade = match self.execute_paper_trade(&strategy, &signal) {
            Ok(trade) => trade,
            Err(e) => {
                error!(strategy_id, error = %e, "error executing paper trade");
                None
            }
        };

        Ok(Some(StrategyRun { signal, trade }))
    }
}
