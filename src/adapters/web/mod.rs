//! Web server adapter.
//!
//! JSON API under `/api` plus three server-rendered pages. Handlers share an
//! [`AppState`] holding the store and the optional live market data source.

mod error;
mod handlers;
mod templates;

pub use error::{PageError, WebError};
pub use templates::*;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::domain::trading::DEFAULT_LOOKBACK_DAYS;
use crate::ports::market_data_port::MarketDataSource;
use crate::ports::store_port::StorePort;

pub const SERVICE_NAME: &str = "investment-portfolio-api";

pub struct AppState {
    pub store: Arc<dyn StorePort + Send + Sync>,
    pub market_source: Option<Arc<dyn MarketDataSource + Send + Sync>>,
    pub lookback_days: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn StorePort + Send + Sync>) -> Self {
        Self {
            store,
            market_source: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_market_source(mut self, source: Arc<dyn MarketDataSource + Send + Sync>) -> Self {
        self.market_source = Some(source);
        self
    }

    pub fn with_lookback_days(mut self, days: usize) -> Self {
        self.lookback_days = days;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/dashboard", get(handlers::dashboard))
        .route("/trading", get(handlers::trading_dashboard))
        .route("/health", get(handlers::health))
        .route(
            "/api/portfolios",
            get(handlers::list_portfolios).post(handlers::create_portfolio),
        )
        .route(
            "/api/portfolios/{id}",
            get(handlers::get_portfolio).delete(handlers::delete_portfolio),
        )
        .route(
            "/api/portfolios/{id}/investments",
            get(handlers::list_investments).post(handlers::add_investment),
        )
        .route(
            "/api/investments/{id}/price",
            put(handlers::update_investment_price),
        )
        .route(
            "/api/investments/{id}",
            axum::routing::delete(handlers::delete_investment),
        )
        .route(
            "/api/strategies",
            get(handlers::list_strategies).post(handlers::create_strategy),
        )
        .route("/api/strategies/{id}", get(handlers::get_strategy))
        .route("/api/strategies/{id}/run", post(handlers::run_strategy))
        .route("/api/trades", get(handlers::list_trades))
        .route(
            "/api/market-data",
            get(handlers::list_market_data).post(handlers::insert_market_data),
        )
        .fallback(handlers::not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(Arc::new(state))
}
