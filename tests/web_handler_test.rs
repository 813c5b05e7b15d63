#![cfg(feature = "web")]
//! Web handler integration tests.
//!
//! Tests cover:
//! - Health check and JSON 404 fallback
//! - Portfolio create/get round trip and cascade delete
//! - Investments, price updates and validation errors
//! - Strategy runs, trade listing and market data endpoints
//! - Rendered pages

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use quantfolio::adapters::sqlite_adapter::SqliteAdapter;
use quantfolio::adapters::web::{AppState, build_router};
use quantfolio::ports::store_port::StorePort;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use common::*;

fn create_test_app() -> (Router, Arc<SqliteAdapter>) {
    let store = Arc::new(memory_store());
    let state = AppState::new(store.clone());
    (build_router(state), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get_html(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

mod service {
    use super::*;

    #[tokio::test]
    async fn health_reports_service_name() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "investment-portfolio-api");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "GET", "/api/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

mod portfolios {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (app, _) = create_test_app();
        let (status, created) = send(
            &app,
            "POST",
            "/api/portfolios",
            Some(json!({"name": "Retirement", "description": "long term"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["success"], true);
        let id = created["portfolio"]["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, "GET", &format!("/api/portfolios/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let portfolio = &fetched["portfolio"];
        for field in ["id", "name", "description", "created_at", "updated_at"] {
            assert_eq!(portfolio[field], created["portfolio"][field], "field {field}");
        }
        assert_eq!(portfolio["total_value"], 0.0);
        assert_eq!(portfolio["investment_count"], 0);
        assert_eq!(portfolio["investments"], json!([]));
    }

    #[tokio::test]
    async fn blank_name_is_400() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "POST", "/api/portfolios", Some(json!({"name": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "POST", "/api/portfolios", Some(json!({"title": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn missing_portfolio_is_404() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "GET", "/api/portfolios/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "portfolio 99 not found");
    }

    #[tokio::test]
    async fn list_includes_totals() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        seed_investment(store.as_ref(), p.id, "AAPL", 2.0, 150.0);

        let (status, body) = send(&app, "GET", "/api/portfolios", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body["portfolios"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["total_value"], 300.0);
        assert_eq!(list[0]["investment_count"], 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        seed_investment(store.as_ref(), p.id, "MSFT", 10.0, 100.0);
        let s = seed_strategy(store.as_ref(), p.id, "AAPL");
        store
            .upsert_market_data(&bars_from_closes(
                "AAPL",
                date(2024, 1, 1),
                &trending_closes(100.0, 1.0, 31),
            ))
            .unwrap();
        let (status, run) = send(&app, "POST", &format!("/api/strategies/{}/run", s.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(run["result"]["trade"].is_object());

        let (status, _) = send(&app, "DELETE", &format!("/api/portfolios/{}", p.id), None).await;
        assert_eq!(status, StatusCode::OK);

        assert!(store.get_portfolio(p.id).unwrap().is_none());
        assert!(store.list_investments(p.id).unwrap().is_empty());
        assert!(store.get_strategy(s.id).unwrap().is_none());
        let (_, trades) = send(&app, "GET", &format!("/api/trades?portfolio_id={}", p.id), None).await;
        assert_eq!(trades["trades"], json!([]));
        // Market data is not owned by a portfolio.
        assert_eq!(store.list_market_data(Some("AAPL"), 100).unwrap().len(), 31);

        let (status, _) = send(&app, "DELETE", &format!("/api/portfolios/{}", p.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod investments {
    use super::*;

    #[tokio::test]
    async fn add_update_and_delete() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");

        let (status, created) = send(
            &app,
            "POST",
            &format!("/api/portfolios/{}/investments", p.id),
            Some(json!({
                "symbol": "aapl",
                "name": "Apple Inc.",
                "quantity": 10.0,
                "purchase_price": 150.0,
                "purchase_date": "2024-01-02"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let inv = &created["investment"];
        assert_eq!(inv["symbol"], "AAPL");
        let id = inv["id"].as_i64().unwrap();

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/investments/{id}/price"),
            Some(json!({"price": 165.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["investment"]["current_value"], 1650.0);
        assert_eq!(updated["investment"]["gain_loss"], 150.0);
        assert_eq!(updated["investment"]["gain_loss_percentage"], 10.0);

        let (_, listed) = send(&app, "GET", &format!("/api/portfolios/{}/investments", p.id), None).await;
        assert_eq!(listed["investments"].as_array().unwrap().len(), 1);
        assert_eq!(listed["total_value"], 1650.0);

        let (status, _) = send(&app, "DELETE", &format!("/api/investments/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "DELETE", &format!("/api/investments/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_positive_quantity_is_400() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/portfolios/{}/investments", p.id),
            Some(json!({
                "symbol": "AAPL",
                "quantity": 0.0,
                "purchase_price": 150.0,
                "purchase_date": "2024-01-02"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn investments_of_missing_portfolio_is_404() {
        let (app, _) = create_test_app();
        let (status, _) = send(&app, "GET", "/api/portfolios/7/investments", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn price_update_of_missing_investment_is_404() {
        let (app, _) = create_test_app();
        let (status, _) = send(
            &app,
            "PUT",
            "/api/investments/5/price",
            Some(json!({"price": 1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod strategies {
    use super::*;

    #[tokio::test]
    async fn create_applies_defaults() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        let (status, body) = send(
            &app,
            "POST",
            "/api/strategies",
            Some(json!({"portfolio_id": p.id, "name": "Trend", "symbol": "msft"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let s = &body["strategy"];
        assert_eq!(s["symbol"], "MSFT");
        assert_eq!(s["confidence_threshold"], 0.5);
        assert_eq!(s["position_size"], 0.1);
        assert_eq!(s["is_active"], true);
        assert_eq!(s["total_trades"], 0);

        let id = s["id"].as_i64().unwrap();
        let (status, fetched) = send(&app, "GET", &format!("/api/strategies/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["strategy"]["name"], "Trend");

        let (_, listed) = send(&app, "GET", &format!("/api/strategies?portfolio_id={}", p.id), None).await;
        assert_eq!(listed["strategies"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_position_is_400() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        let (status, _) = send(
            &app,
            "POST",
            "/api/strategies",
            Some(json!({"portfolio_id": p.id, "name": "Big", "symbol": "MSFT", "position_size": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn run_without_data_returns_null_result() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        let s = seed_strategy(store.as_ref(), p.id, "AAPL");

        let (status, body) = send(&app, "POST", &format!("/api/strategies/{}/run", s.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["result"].is_null());
    }

    #[tokio::test]
    async fn run_unknown_strategy_is_404() {
        let (app, _) = create_test_app();
        let (status, body) = send(&app, "POST", "/api/strategies/31/run", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn run_uses_configured_market_source() {
        let store = Arc::new(memory_store());
        let p = seed_portfolio(store.as_ref(), "Core");
        seed_investment(store.as_ref(), p.id, "MSFT", 10.0, 100.0);
        let s = seed_strategy(store.as_ref(), p.id, "AAPL");
        let source = MockMarketSource::new()
            .with_bars(
                "AAPL",
                bars_from_closes("AAPL", date(2024, 2, 1), &trending_closes(50.0, 0.5, 40)),
            )
            .with_price("AAPL", 70.0);
        let app = build_router(AppState::new(store.clone()).with_market_source(Arc::new(source)));

        let (status, body) = send(&app, "POST", &format!("/api/strategies/{}/run", s.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["signal"]["action"], "buy");
        assert_eq!(body["result"]["trade"]["price"], 70.0);

        let (_, trades) = send(&app, "GET", &format!("/api/trades?strategy_id={}", s.id), None).await;
        assert_eq!(trades["trades"].as_array().unwrap().len(), 1);
    }
}

mod market_data {
    use super::*;

    #[tokio::test]
    async fn post_then_list_by_symbol() {
        let (app, _) = create_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/market-data",
            Some(json!([
                {"symbol": "aapl", "date": "2024-01-02", "open": 100.0, "high": 102.0, "low": 99.0, "close": 101.0, "volume": 1000},
                {"symbol": "aapl", "date": "2024-01-03", "open": 101.0, "high": 103.0, "low": 100.0, "close": 102.0, "volume": 1200}
            ])),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["inserted"], 2);

        let (status, body) = send(&app, "GET", "/api/market-data?symbol=AAPL&limit=1", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["date"], "2024-01-03");
        assert_eq!(rows[0]["close"], 102.0);
    }

    #[tokio::test]
    async fn single_row_body_is_accepted() {
        let (app, _) = create_test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/market-data",
            Some(json!({"symbol": "MSFT", "date": "2024-01-02", "open": 1.0, "high": 2.0, "low": 1.0, "close": 2.0, "volume": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["inserted"], 1);
    }

    #[tokio::test]
    async fn high_below_low_is_400() {
        let (app, _) = create_test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/market-data",
            Some(json!({"symbol": "MSFT", "date": "2024-01-02", "open": 1.0, "high": 1.0, "low": 2.0, "close": 2.0, "volume": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod pages {
    use super::*;

    #[tokio::test]
    async fn index_renders() {
        let (app, _) = create_test_app();
        let (status, html) = get_html(&app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Quantfolio"));
    }

    #[tokio::test]
    async fn dashboard_lists_portfolios() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Retirement");
        seed_investment(store.as_ref(), p.id, "VTI", 4.0, 250.0);

        let (status, html) = get_html(&app, "/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Retirement"));
        assert!(html.contains("1000.00"));
    }

    #[tokio::test]
    async fn trading_page_lists_strategies() {
        let (app, store) = create_test_app();
        let p = seed_portfolio(store.as_ref(), "Core");
        seed_strategy(store.as_ref(), p.id, "NVDA");

        let (status, html) = get_html(&app, "/trading").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("NVDA trend"));
        assert!(html.contains("No trades yet"));
    }
}
