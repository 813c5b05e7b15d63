//! Input validation for records entering the store.

use super::error::QuantfolioError;
use super::investment::NewInvestment;
use super::ohlcv::OhlcvBar;
use super::portfolio::NewPortfolio;
use super::strategy::NewStrategy;

pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_NAME_LEN: usize = 100;

/// Trims and upper-cases a ticker symbol.
pub fn normalize_symbol(symbol: &str) -> Result<String, QuantfolioError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(QuantfolioError::validation("symbol is required"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(QuantfolioError::validation(format!(
            "symbol '{symbol}' exceeds {MAX_SYMBOL_LEN} characters"
        )));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(QuantfolioError::validation(format!(
            "symbol '{symbol}' contains invalid characters"
        )));
    }
    Ok(symbol)
}

fn validate_name(field: &str, name: &str) -> Result<(), QuantfolioError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(QuantfolioError::validation(format!("{field} is required")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(QuantfolioError::validation(format!(
            "{field} exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_new_portfolio(input: &NewPortfolio) -> Result<(), QuantfolioError> {
    validate_name("name", &input.name)
}

pub fn validate_new_investment(input: &NewInvestment) -> Result<(), QuantfolioError> {
    normalize_symbol(&input.symbol)?;
    if let Some(name) = &input.name {
        validate_name("name", name)?;
    }
    if !(input.quantity.is_finite() && input.quantity > 0.0) {
        return Err(QuantfolioError::validation("quantity must be positive"));
    }
    if !(input.purchase_price.is_finite() && input.purchase_price >= 0.0) {
        return Err(QuantfolioError::validation(
            "purchase_price must be non-negative",
        ));
    }
    if let Some(price) = input.current_price {
        validate_price(price)?;
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), QuantfolioError> {
    if !(price.is_finite() && price >= 0.0) {
        return Err(QuantfolioError::validation("price must be non-negative"));
    }
    Ok(())
}

pub fn validate_new_strategy(input: &NewStrategy) -> Result<(), QuantfolioError> {
    validate_name("name", &input.name)?;
    normalize_symbol(&input.symbol)?;
    if !(input.confidence_threshold.is_finite() && input.confidence_threshold > 0.0) {
        return Err(QuantfolioError::validation(
            "confidence_threshold must be positive",
        ));
    }
    if !(input.position_size > 0.0 && input.position_size <= 1.0) {
        return Err(QuantfolioError::validation(
            "position_size must be in (0, 1]",
        ));
    }
    if !(input.max_position_size >= input.position_size && input.max_position_size <= 1.0) {
        return Err(QuantfolioError::validation(
            "max_position_size must be between position_size and 1",
        ));
    }
    Ok(())
}

pub fn validate_bar(bar: &OhlcvBar) -> Result<(), QuantfolioError> {
    normalize_symbol(&bar.symbol)?;
    for (field, value) in [
        ("open", bar.open),
        ("high", bar.high),
        ("low", bar.low),
        ("close", bar.close),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(QuantfolioError::validation(format!(
                "{field} must be non-negative on {} {}",
                bar.symbol, bar.date
            )));
        }
    }
    if bar.high < bar.low {
        return Err(QuantfolioError::validation(format!(
            "high below low on {} {}",
            bar.symbol, bar.date
        )));
    }
    if bar.volume < 0 {
        return Err(QuantfolioError::validation(format!(
            "volume must be non-negative on {} {}",
            bar.symbol, bar.date
        )));
    }
    Ok(())
}
