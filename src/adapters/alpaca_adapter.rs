//! Alpaca market data v2 client.

use crate::domain::config_validation::{ALPACA_DATA_URL_ENV, ALPACA_KEY_ENV, ALPACA_SECRET_ENV};
use crate::domain::error::QuantfolioError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataSource;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";
const PAGE_LIMIT: &str = "10000";

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlpacaBar {
    t: DateTime<Utc>,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

#[derive(Debug, Deserialize)]
struct LatestTradeResponse {
    trade: LatestTrade,
}

#[derive(Debug, Deserialize)]
struct LatestTrade {
    p: f64,
}

#[derive(Debug, Clone)]
pub struct AlpacaAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
}

impl AlpacaAdapter {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, QuantfolioError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuantfolioError::Broker {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: DEFAULT_DATA_URL.to_string(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Builds a client when credentials are configured. Environment
    /// variables override the `[alpaca]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Option<Self>, QuantfolioError> {
        let key = config.get_string_or_env("alpaca", "api_key", ALPACA_KEY_ENV);
        let secret = config.get_string_or_env("alpaca", "secret_key", ALPACA_SECRET_ENV);
        let (Some(key), Some(secret)) = (key, secret) else {
            return Ok(None);
        };

        let timeout = config.get_int("alpaca", "timeout_secs", 30).max(1) as u64;
        let base_url = config
            .get_string_or_env("alpaca", "data_url", ALPACA_DATA_URL_ENV)
            .unwrap_or_else(|| DEFAULT_DATA_URL.to_string());

        Ok(Some(
            Self::new(key, secret, Duration::from_secs(timeout))?.with_base_url(&base_url),
        ))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
    }

    fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, QuantfolioError> {
        let response = request.send().map_err(|e| QuantfolioError::Broker {
            reason: format!("request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QuantfolioError::Broker {
                reason: format!("HTTP {status}: {body}"),
            });
        }

        response.json().map_err(|e| QuantfolioError::Broker {
            reason: format!("failed to parse response: {e}"),
        })
    }
}

impl MarketDataSource for AlpacaAdapter {
    fn daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, QuantfolioError> {
        let path = format!("/v2/stocks/{symbol}/bars");
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeframe", "1Day"),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("limit", PAGE_LIMIT),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("page_token", token));
            }

            let page: BarsResponse = Self::fetch(self.get(&path).query(&query))?;
            bars.extend(page.bars.unwrap_or_default().into_iter().map(|b| OhlcvBar {
                symbol: symbol.to_string(),
                date: b.t.date_naive(),
                open: b.o,
                high: b.h,
                low: b.l,
                close: b.c,
                volume: b.v.round() as i64,
            }));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        bars.sort_by_key(|b| b.date);
        debug!(symbol, count = bars.len(), "fetched daily bars");
        Ok(bars)
    }

    fn latest_price(&self, symbol: &str) -> Result<f64, QuantfolioError> {
        let path = format!("/v2/stocks/{symbol}/trades/latest");
        let latest: LatestTradeResponse = Self::fetch(self.get(&path))?;
        Ok(latest.trade.p)
    }
}
