//! HTML templates using Askama.

use askama::Template;

use crate::domain::portfolio::PortfolioSummary;
use crate::domain::strategy::TradingStrategy;
use crate::domain::trade::Trade;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub portfolio_count: usize,
    pub strategy_count: usize,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub portfolios: &'a [PortfolioSummary],
    pub grand_total: f64,
}

/// One strategy row with its win rate already expressed in percent.
pub struct StrategyRow<'a> {
    pub strategy: &'a TradingStrategy,
    pub win_rate_pct: f64,
}

impl<'a> StrategyRow<'a> {
    pub fn new(strategy: &'a TradingStrategy) -> Self {
        Self {
            strategy,
            win_rate_pct: strategy.win_rate() * 100.0,
        }
    }
}

#[derive(Template)]
#[template(path = "trading.html")]
pub struct TradingTemplate<'a> {
    pub strategies: Vec<StrategyRow<'a>>,
    pub trades: &'a [Trade],
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}
