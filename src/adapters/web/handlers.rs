//! HTTP request handlers for the web adapter.

use askama::Template;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::domain::error::QuantfolioError;
use crate::domain::investment::{NewInvestment, PriceUpdate};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::portfolio::{total_value, NewPortfolio, PortfolioSummary};
use crate::domain::strategy::NewStrategy;
use crate::domain::trade::TradeFilter;
use crate::domain::trading::TradingService;
use crate::ports::market_data_port::MarketDataSource;

use super::templates::{DashboardTemplate, IndexTemplate, StrategyRow, TradingTemplate};
use super::{AppState, PageError, SERVICE_NAME, WebError};

const DEFAULT_LIST_LIMIT: usize = 100;
const RECENT_TRADES_ON_PAGE: usize = 20;

type ApiResult = Result<Response, WebError>;

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, WebError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| WebError::bad_request(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, WebError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| WebError::bad_request(rejection.body_text()))
}

fn render(template: &impl Template) -> Result<Html<String>, PageError> {
    template
        .render()
        .map(Html)
        .map_err(|e| PageError(WebError::internal(format!("template error: {e}"))))
}

fn missing(entity: &'static str, id: i64) -> WebError {
    QuantfolioError::NotFound { entity, id }.into()
}

// -- pages --

pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, PageError> {
    let portfolio_count = state.store.list_portfolios()?.len();
    let strategy_count = state.store.list_strategies(None)?.len();
    render(&IndexTemplate {
        portfolio_count,
        strategy_count,
    })
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Html<String>, PageError> {
    let portfolios = state.store.portfolio_summaries()?;
    let grand_total = portfolios.iter().map(|p| p.total_value).sum();
    render(&DashboardTemplate {
        portfolios: &portfolios,
        grand_total,
    })
}

pub async fn trading_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Html<String>, PageError> {
    let strategies = state.store.list_strategies(None)?;
    let trades = state
        .store
        .list_trades(TradeFilter::default(), Some(RECENT_TRADES_ON_PAGE))?;
    render(&TradingTemplate {
        strategies: strategies.iter().map(StrategyRow::new).collect(),
        trades: &trades,
    })
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": SERVICE_NAME,
    }))
}

pub async fn not_found() -> WebError {
    WebError::not_found("resource not found")
}

// -- portfolios --

pub async fn list_portfolios(State(state): State<Arc<AppState>>) -> ApiResult {
    let portfolios = state.store.portfolio_summaries()?;
    Ok(Json(json!({ "success": true, "portfolios": portfolios })).into_response())
}

pub async fn create_portfolio(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewPortfolio>, JsonRejection>,
) -> ApiResult {
    let input = json_body(body)?;
    let portfolio = state.store.create_portfolio(&input)?;
    let summary = PortfolioSummary::new(portfolio, &[]);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "portfolio": summary })),
    )
        .into_response())
}

pub async fn get_portfolio(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult {
    let detail = state
        .store
        .portfolio_detail(id)?
        .ok_or_else(|| missing("portfolio", id))?;
    Ok(Json(json!({ "success": true, "portfolio": detail })).into_response())
}

pub async fn delete_portfolio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult {
    if !state.store.delete_portfolio(id)? {
        return Err(missing("portfolio", id));
    }
    Ok(Json(json!({ "success": true, "message": "Portfolio deleted" })).into_response())
}

// -- investments --

pub async fn list_investments(
    State(state): State<Arc<AppState>>,
    Path(portfolio_id): Path<i64>,
) -> ApiResult {
    if state.store.get_portfolio(portfolio_id)?.is_none() {
        return Err(missing("portfolio", portfolio_id));
    }
    let investments = state.store.list_investments(portfolio_id)?;
    Ok(Json(json!({
        "success": true,
        "investments": investments,
        "total_value": total_value(&investments),
    }))
    .into_response())
}

pub async fn add_investment(
    State(state): State<Arc<AppState>>,
    Path(portfolio_id): Path<i64>,
    body: Result<Json<NewInvestment>, JsonRejection>,
) -> ApiResult {
    let input = json_body(body)?;
    let investment = state.store.add_investment(portfolio_id, &input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "investment": investment })),
    )
        .into_response())
}

pub async fn update_investment_price(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Result<Json<PriceUpdate>, JsonRejection>,
) -> ApiResult {
    let update = json_body(body)?;
    let investment = state
        .store
        .update_investment_price(id, update.price)?
        .ok_or_else(|| missing("investment", id))?;
    Ok(Json(json!({ "success": true, "investment": investment })).into_response())
}

pub async fn delete_investment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult {
    if !state.store.delete_investment(id)? {
        return Err(missing("investment", id));
    }
    Ok(Json(json!({ "success": true, "message": "Investment deleted" })).into_response())
}

// -- strategies --

#[derive(Debug, Default, Deserialize)]
pub struct StrategyQuery {
    pub portfolio_id: Option<i64>,
}

pub async fn list_strategies(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StrategyQuery>, QueryRejection>,
) -> ApiResult {
    let query = query_params(query)?;
    let strategies = state.store.list_strategies(query.portfolio_id)?;
    Ok(Json(json!({ "success": true, "strategies": strategies })).into_response())
}

pub async fn create_strategy(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewStrategy>, JsonRejection>,
) -> ApiResult {
    let input = json_body(body)?;
    let strategy = state.store.create_strategy(&input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "strategy": strategy })),
    )
        .into_response())
}

pub async fn get_strategy(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult {
    let strategy = state
        .store
        .get_strategy(id)?
        .ok_or_else(|| missing("strategy", id))?;
    Ok(Json(json!({ "success": true, "strategy": strategy })).into_response())
}

/// Runs the signal pipeline off the async runtime; the broker client blocks.
pub async fn run_strategy(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult {
    let result = tokio::task::spawn_blocking(move || {
        let source = state
            .market_source
            .as_deref()
            .map(|s| s as &dyn MarketDataSource);
        TradingService::new(state.store.as_ref(), source)
            .with_lookback_days(state.lookback_days)
            .run_strategy(id)
    })
    .await
    .map_err(|e| WebError::internal(format!("strategy run aborted: {e}")))??;

    Ok(Json(json!({ "success": true, "result": result })).into_response())
}

// -- trades --

#[derive(Debug, Default, Deserialize)]
pub struct TradeQuery {
    pub strategy_id: Option<i64>,
    pub portfolio_id: Option<i64>,
    pub limit: Option<usize>,
}

pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TradeQuery>, QueryRejection>,
) -> ApiResult {
    let query = query_params(query)?;
    let filter = TradeFilter {
        strategy_id: query.strategy_id,
        portfolio_id: query.portfolio_id,
    };
    let trades = state
        .store
        .list_trades(filter, Some(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)))?;
    Ok(Json(json!({ "success": true, "trades": trades })).into_response())
}

// -- market data --

#[derive(Debug, Default, Deserialize)]
pub struct MarketDataQuery {
    pub symbol: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MarketDataPayload {
    Many(Vec<OhlcvBar>),
    One(OhlcvBar),
}

impl MarketDataPayload {
    fn into_bars(self) -> Vec<OhlcvBar> {
        match self {
            MarketDataPayload::Many(bars) => bars,
            MarketDataPayload::One(bar) => vec![bar],
        }
    }
}

pub async fn list_market_data(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MarketDataQuery>, QueryRejection>,
) -> ApiResult {
    let query = query_params(query)?;
    let symbol = query.symbol.as_deref().filter(|s| !s.trim().is_empty());
    let rows = state
        .store
        .list_market_data(symbol, query.limit.unwrap_or(DEFAULT_LIST_LIMIT))?;
    Ok(Json(json!({ "success": true, "data": rows })).into_response())
}

pub async fn insert_market_data(
    State(state): State<Arc<AppState>>,
    body: Result<Json<MarketDataPayload>, JsonRejection>,
) -> ApiResult {
    let bars = json_body(body)?.into_bars();
    if bars.is_empty() {
        return Err(WebError::bad_request("no market data rows supplied"));
    }
    let inserted = state.store.upsert_market_data(&bars)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "inserted": inserted })),
    )
        .into_response())
}
