//! Return series, trend model and buy/sell/hold decisions.

use serde::Serialize;
use std::fmt;

use super::error::QuantfolioError;
use super::regression::LinearFit;
use super::strategy::ModelParameters;
use super::trade::TradeSide;

/// Fewer return observations than this produce no model.
pub const MIN_RETURN_OBSERVATIONS: usize = 10;

/// First differences of consecutive closing prices.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Linear trend of returns against their day index plus summary statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalModel {
    pub fit: LinearFit,
    pub mean_return: f64,
    /// Population standard deviation of the returns.
    pub std_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub predicted_return: f64,
    pub confidence: f64,
}

impl SignalModel {
    pub fn fit(returns: &[f64]) -> Option<Self> {
        if returns.len() < MIN_RETURN_OBSERVATIONS {
            return None;
        }
        let n = returns.len() as f64;
        let index: Vec<f64> = (0..returns.len()).map(|i| i as f64).collect();
        let fit = LinearFit::fit(&index, returns)?;

        let mean_return = returns.iter().sum::<f64>() / n;
        let variance = returns
            .iter()
            .map(|r| {
                let diff = r - mean_return;
                diff * diff
            })
            .sum::<f64>()
            / n;

        Some(SignalModel {
            fit,
            mean_return,
            std_return: variance.sqrt(),
        })
    }

    pub fn predict_next(&self, next_index: usize) -> Prediction {
        Prediction {
            predicted_return: self.fit.predict(next_index as f64),
            confidence: self.std_return,
        }
    }

    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            alpha_mean: self.fit.intercept,
            alpha_std: self.fit.std_err,
            beta_mean: self.fit.slope,
            beta_std: self.fit.std_err,
            sigma_mean: self.std_return,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    /// The trade side to book, if the action trades at all.
    pub fn side(&self) -> Option<TradeSide> {
        match self {
            SignalAction::Buy => Some(TradeSide::Buy),
            SignalAction::Sell => Some(TradeSide::Sell),
            SignalAction::Hold => None,
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalAction::Buy => "buy",
            SignalAction::Sell => "sell",
            SignalAction::Hold => "hold",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub symbol: String,
    pub predicted_return: f64,
    pub confidence: f64,
    pub action: SignalAction,
    pub reasoning: String,
}

/// Trades only when the spread of returns is under the threshold; the sign
/// of the prediction picks the side.
pub fn decide(predicted_return: f64, confidence: f64, threshold: f64) -> (SignalAction, String) {
    if predicted_return > 0.0 && confidence < threshold {
        (
            SignalAction::Buy,
            format!(
                "Positive return predicted ({predicted_return:.4}) with acceptable confidence ({confidence:.4})"
            ),
        )
    } else if predicted_return < 0.0 && confidence < threshold {
        (
            SignalAction::Sell,
            format!(
                "Negative return predicted ({predicted_return:.4}) with acceptable confidence ({confidence:.4})"
            ),
        )
    } else {
        (
            SignalAction::Hold,
            format!(
                "Predicted return ({predicted_return:.4}) outside confidence threshold ({threshold})"
            ),
        )
    }
}

impl Signal {
    pub fn from_prediction(symbol: &str, prediction: Prediction, threshold: f64) -> Self {
        let (action, reasoning) =
            decide(prediction.predicted_return, prediction.confidence, threshold);
        Signal {
            symbol: symbol.to_string(),
            predicted_return: prediction.predicted_return,
            confidence: prediction.confidence,
            action,
            reasoning,
        }
    }
}

/// Shares to trade: portfolio_value * fraction / price.
pub fn position_quantity(
    portfolio_value: f64,
    fraction: f64,
    price: f64,
) -> Result<f64, QuantfolioError> {
    if price.is_nan() || price <= 0.0 {
        return Err(QuantfolioError::validation(format!(
            "price must be positive, got {price}"
        )));
    }
    Ok(portfolio_value * fraction / price)
}
