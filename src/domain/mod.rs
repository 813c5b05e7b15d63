//! Core domain types and logic.

pub mod error;
pub mod ohlcv;
pub mod portfolio;
pub mod investment;
pub mod strategy;
pub mod trade;
pub mod regression;
pub mod signal;
pub mod trading;
pub mod validation;
pub mod config_validation;
