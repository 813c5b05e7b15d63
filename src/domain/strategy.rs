//! Trading strategy configuration and performance counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::trade::TradeSide;

/// Regression parameters stamped onto a strategy after each fit.
///
/// The alpha/beta/sigma naming is historical: values come from a plain
/// least-squares fit (alpha = intercept, beta = slope, both with the slope's
/// standard error; sigma = standard deviation of the returns).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModelParameters {
    pub alpha_mean: f64,
    pub alpha_std: f64,
    pub beta_mean: f64,
    pub beta_std: f64,
    pub sigma_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingStrategy {
    pub id: i64,
    pub portfolio_id: i64,
    pub name: String,
    pub description: String,
    pub symbol: String,
    pub confidence_threshold: f64,
    pub position_size: f64,
    pub max_position_size: f64,
    pub is_active: bool,
    #[serde(flatten)]
    pub model: ModelParameters,
    pub total_trades: i64,
    pub winning_trades: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TradingStrategy {
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        self.winning_trades as f64 / self.total_trades as f64
    }
}

/// A booked trade counts as winning when its side agrees with the sign of
/// the predicted return.
pub fn is_winning(side: TradeSide, predicted_return: f64) -> bool {
    match side {
        TradeSide::Buy => predicted_return > 0.0,
        TradeSide::Sell => predicted_return < 0.0,
    }
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_position_size() -> f64 {
    0.1
}

fn default_max_position_size() -> f64 {
    0.2
}

fn default_active() -> bool {
    true
}

/// Request body for creating a strategy.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStrategy {
    pub portfolio_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub symbol: String,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_position_size")]
    pub position_size: f64,
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}
