//! Portfolios and their valuation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::investment::Investment;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a portfolio.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPortfolio {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A portfolio together with the figures derived from its investments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub total_value: f64,
    pub investment_count: usize,
}

impl PortfolioSummary {
    pub fn new(portfolio: Portfolio, investments: &[Investment]) -> Self {
        PortfolioSummary {
            portfolio,
            total_value: total_value(investments),
            investment_count: investments.len(),
        }
    }
}

/// A portfolio with its holdings, as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioDetail {
    #[serde(flatten)]
    pub summary: PortfolioSummary,
    pub investments: Vec<Investment>,
}

/// Sum of the current values of all investments.
pub fn total_value(investments: &[Investment]) -> f64 {
    investments.iter().map(|i| i.current_value).sum()
}
