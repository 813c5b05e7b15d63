//! Individual holdings within a portfolio.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Investment {
    pub id: i64,
    pub portfolio_id: i64,
    pub symbol: String,
    pub name: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
    pub current_price: f64,
    pub current_value: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Investment {
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.purchase_price
    }

    /// current_value - cost_basis
    pub fn gain_loss(&self) -> f64 {
        self.current_value - self.cost_basis()
    }

    /// Gain/loss as a percentage of cost basis; 0 when nothing was paid.
    pub fn gain_loss_percentage(&self) -> f64 {
        let basis = self.cost_basis();
        if basis == 0.0 {
            return 0.0;
        }
        self.gain_loss() / basis * 100.0
    }

    pub fn update_current_value(&mut self, new_price: f64) {
        self.current_price = new_price;
        self.current_value = self.quantity * new_price;
        self.updated_at = Utc::now();
    }
}

#[derive(Serialize)]
struct InvestmentJson<'a> {
    id: i64,
    portfolio_id: i64,
    symbol: &'a str,
    name: &'a str,
    quantity: f64,
    purchase_price: f64,
    purchase_date: NaiveDate,
    current_price: f64,
    current_value: f64,
    gain_loss: f64,
    gain_loss_percentage: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Serialize for Investment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        InvestmentJson {
            id: self.id,
            portfolio_id: self.portfolio_id,
            symbol: &self.symbol,
            name: &self.name,
            quantity: self.quantity,
            purchase_price: self.purchase_price,
            purchase_date: self.purchase_date,
            current_price: self.current_price,
            current_value: self.current_value,
            gain_loss: self.gain_loss(),
            gain_loss_percentage: self.gain_loss_percentage(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .serialize(serializer)
    }
}

/// Request body for adding a holding to a portfolio.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInvestment {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: f64,
    pub purchase_price: f64,
    pub purchase_date: NaiveDate,
    #[serde(default)]
    pub current_price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceUpdate {
    pub price: f64,
}
