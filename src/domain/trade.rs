//! Simulated trades booked from signals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(format!("unknown trade side '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Filled,
    Cancelled,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Filled => "filled",
            TradeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TradeStatus::Pending),
            "filled" => Ok(TradeStatus::Filled),
            "cancelled" => Ok(TradeStatus::Cancelled),
            other => Err(format!("unknown trade status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub id: i64,
    pub strategy_id: i64,
    pub portfolio_id: i64,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub status: TradeStatus,
    pub predicted_return: f64,
    pub confidence: f64,
    pub alpha_sample: f64,
    pub beta_sample: f64,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// A trade about to be booked; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub strategy_id: i64,
    pub portfolio_id: i64,
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
    pub status: TradeStatus,
    pub predicted_return: f64,
    pub confidence: f64,
}

/// Optional filters for listing trades.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TradeFilter {
    pub strategy_id: Option<i64>,
    pub portfolio_id: Option<i64>,
}
