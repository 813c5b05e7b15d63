#![allow(dead_code)]

use chrono::NaiveDate;
use quantfolio::adapters::sqlite_adapter::SqliteAdapter;
use quantfolio::domain::error::QuantfolioError;
use quantfolio::domain::investment::NewInvestment;
pub use quantfolio::domain::ohlcv::OhlcvBar;
use quantfolio::domain::portfolio::{NewPortfolio, Portfolio};
use quantfolio::domain::strategy::{NewStrategy, TradingStrategy};
use quantfolio::ports::market_data_port::MarketDataSource;
use quantfolio::ports::store_port::StorePort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory broker: canned bars and prices per symbol.
pub struct MockMarketSource {
    pub bars: HashMap<String, Vec<OhlcvBar>>,
    pub prices: HashMap<String, f64>,
    pub fail: bool,
    pub bar_requests: AtomicUsize,
}

impl MockMarketSource {
    pub fn new() -> Self {
        Self {
            bars: HashMap::new(),
            prices: HashMap::new(),
            fail: false,
            bar_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn requests(&self) -> usize {
        self.bar_requests.load(Ordering::SeqCst)
    }
}

impl MarketDataSource for MockMarketSource {
    fn daily_bars(
        &self,
        symbol: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QuantfolioError> {
        self.bar_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(QuantfolioError::Broker {
                reason: "connection refused".into(),
            });
        }
        Ok(self.bars.get(symbol).cloned().unwrap_or_default())
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, QuantfolioError> {
        if self.fail {
            return Err(QuantfolioError::Broker {
                reason: "connection refused".into(),
            });
        }
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| QuantfolioError::Broker {
                reason: format!("no trades for {symbol}"),
            })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One bar per calendar day starting at `start`, one per close.
pub fn bars_from_closes(symbol: &str, start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.0),
            close,
            volume: 1_000,
        })
        .collect()
}

/// Closes rising by `step` each day.
pub fn trending_closes(start_price: f64, step: f64, count: usize) -> Vec<f64> {
    (0..count).map(|i| start_price + step * i as f64).collect()
}

/// Closes alternating between two levels.
pub fn choppy_closes(low: f64, high: f64, count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| if i % 2 == 0 { low } else { high })
        .collect()
}

pub fn memory_store() -> SqliteAdapter {
    let store = SqliteAdapter::in_memory().unwrap();
    store.initialize_schema().unwrap();
    store
}

pub fn seed_portfolio(store: &dyn StorePort, name: &str) -> Portfolio {
    store
        .create_portfolio(&NewPortfolio {
            name: name.to_string(),
            description: Some(format!("{name} holdings")),
        })
        .unwrap()
}

/// Adds a holding valued at `quantity x price`.
pub fn seed_investment(store: &dyn StorePort, portfolio_id: i64, symbol: &str, quantity: f64, price: f64) {
    store
        .add_investment(
            portfolio_id,
            &NewInvestment {
                symbol: symbol.to_string(),
                name: None,
                quantity,
                purchase_price: price,
                purchase_date: date(2024, 1, 2),
                current_price: Some(price),
            },
        )
        .unwrap();
}

pub fn new_strategy(portfolio_id: i64, symbol: &str) -> NewStrategy {
    NewStrategy {
        portfolio_id,
        name: format!("{symbol} trend"),
        description: None,
        symbol: symbol.to_string(),
        confidence_threshold: 0.5,
        position_size: 0.1,
        max_position_size: 0.2,
        is_active: true,
    }
}

pub fn seed_strategy(store: &dyn StorePort, portfolio_id: i64, symbol: &str) -> TradingStrategy {
    store
        .create_strategy(&new_strategy(portfolio_id, symbol))
        .unwrap()
}
