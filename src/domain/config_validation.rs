//! Configuration validation.
//!
//! Checks the INI settings before any adapter is built, so a bad file fails
//! fast with the offending section and key.

use crate::domain::error::QuantfolioError;
use crate::domain::signal::MIN_RETURN_OBSERVATIONS;
use crate::domain::trading::MAX_LOOKBACK_DAYS;
use crate::ports::config_port::ConfigPort;
use std::net::SocketAddr;

pub const ALPACA_KEY_ENV: &str = "ALPACA_API_KEY";
pub const ALPACA_SECRET_ENV: &str = "ALPACA_SECRET_KEY";
pub const ALPACA_DATA_URL_ENV: &str = "ALPACA_DATA_URL";
pub const MAX_POOL_SIZE: i64 = 64;

pub fn validate_app_config(config: &dyn ConfigPort) -> Result<(), QuantfolioError> {
    validate_database(config)?;
    validate_listen(config)?;
    validate_lookback(config)?;
    validate_alpaca(config)?;
    Ok(())
}

fn validate_database(config: &dyn ConfigPort) -> Result<(), QuantfolioError> {
    match config.get_string("database", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(QuantfolioError::ConfigMissing {
                section: "database".to_string(),
                key: "path".to_string(),
            })
        }
    }
    if !(1..=MAX_POOL_SIZE).contains(&config.get_int("database", "pool_size", 4)) {
        return Err(QuantfolioError::ConfigInvalid {
            section: "database".to_string(),
            key: "pool_size".to_string(),
            reason: format!("pool_size must be between 1 and {MAX_POOL_SIZE}"),
        });
    }
    Ok(())
}

fn validate_listen(config: &dyn ConfigPort) -> Result<(), QuantfolioError> {
    if let Some(listen) = config.get_string("web", "listen") {
        listen
            .parse::<SocketAddr>()
            .map_err(|e| QuantfolioError::ConfigInvalid {
                section: "web".to_string(),
                key: "listen".to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), QuantfolioError> {
    let days = config.get_int("trading", "lookback_days", 100);
    if days <= MIN_RETURN_OBSERVATIONS as i64 || days > MAX_LOOKBACK_DAYS as i64 {
        return Err(QuantfolioError::ConfigInvalid {
            section: "trading".to_string(),
            key: "lookback_days".to_string(),
            reason: format!(
                "lookback_days must exceed {MIN_RETURN_OBSERVATIONS} and be at most {MAX_LOOKBACK_DAYS}"
            ),
        });
    }
    Ok(())
}

fn validate_alpaca(config: &dyn ConfigPort) -> Result<(), QuantfolioError> {
    let key = config.get_string_or_env("alpaca", "api_key", ALPACA_KEY_ENV);
    let secret = config.get_string_or_env("alpaca", "secret_key", ALPACA_SECRET_ENV);
    match (key, secret) {
        (Some(_), None) => Err(QuantfolioError::ConfigMissing {
            section: "alpaca".to_string(),
            key: "secret_key".to_string(),
        }),
        (None, Some(_)) => Err(QuantfolioError::ConfigMissing {
            section: "alpaca".to_string(),
            key: "api_key".to_string(),
        }),
        _ => {
            if config.get_int("alpaca", "timeout_secs", 30) < 1 {
                return Err(QuantfolioError::ConfigInvalid {
                    section: "alpaca".to_string(),
                    key: "timeout_secs".to_string(),
                    reason: "timeout_secs must be at least 1".to_string(),
                });
            }
            Ok(())
        }
    }
}
