//! Domain error types.

/// Top-level error type for quantfolio.
#[derive(Debug, thiserror::Error)]
pub enum QuantfolioError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid input: {reason}")]
    Validation { reason: String },

    #[error("no market data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {observations} returns, need {minimum}")]
    InsufficientData {
        symbol: String,
        observations: usize,
        minimum: usize,
    },

    #[error("broker error: {reason}")]
    Broker { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantfolioError {
    pub fn validation(reason: impl Into<String>) -> Self {
        QuantfolioError::Validation {
            reason: reason.into(),
        }
    }

    pub fn query(err: impl std::fmt::Display) -> Self {
        QuantfolioError::DatabaseQuery {
            reason: err.to_string(),
        }
    }
}

impl From<&QuantfolioError> for std::process::ExitCode {
    fn from(err: &QuantfolioError) -> Self {
        let code: u8 = match err {
            QuantfolioError::Io(_) => 1,
            QuantfolioError::ConfigParse { .. }
            | QuantfolioError::ConfigMissing { .. }
            | QuantfolioError::ConfigInvalid { .. } => 2,
            QuantfolioError::Database { .. } | QuantfolioError::DatabaseQuery { .. } => 3,
            QuantfolioError::NotFound { .. } | QuantfolioError::Validation { .. } => 4,
            QuantfolioError::NoData { .. } | QuantfolioError::InsufficientData { .. } => 5,
            QuantfolioError::Broker { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
