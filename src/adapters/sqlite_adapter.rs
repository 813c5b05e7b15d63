//! SQLite store adapter.
//!
//! Every pooled connection enables `foreign_keys`, so deleting a portfolio
//! cascades to its investments, strategies and trades.

use crate::domain::config_validation::MAX_POOL_SIZE;
use crate::domain::error::QuantfolioError;
use crate::domain::investment::{Investment, NewInvestment};
use crate::domain::ohlcv::{MarketData, OhlcvBar};
use crate::domain::portfolio::{NewPortfolio, Portfolio};
use crate::domain::strategy::{ModelParameters, NewStrategy, TradingStrategy};
use crate::domain::trade::{NewTrade, Trade, TradeFilter};
use crate::domain::validation::{
    normalize_symbol, validate_bar, validate_new_investment, validate_new_portfolio,
    validate_new_strategy, validate_price,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS portfolios (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS investments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        portfolio_id INTEGER NOT NULL REFERENCES portfolios(id) ON DELETE CASCADE,
        symbol TEXT NOT NULL,
        name TEXT NOT NULL,
        quantity REAL NOT NULL,
        purchase_price REAL NOT NULL,
        purchase_date TEXT NOT NULL,
        current_price REAL NOT NULL DEFAULT 0,
        current_value REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_investments_portfolio ON investments(portfolio_id);
    CREATE TABLE IF NOT EXISTS trading_strategies (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        portfolio_id INTEGER NOT NULL REFERENCES portfolios(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        symbol TEXT NOT NULL,
        confidence_threshold REAL NOT NULL,
        position_size REAL NOT NULL,
        max_position_size REAL NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        alpha_mean REAL NOT NULL DEFAULT 0,
        alpha_std REAL NOT NULL DEFAULT 0,
        beta_mean REAL NOT NULL DEFAULT 0,
        beta_std REAL NOT NULL DEFAULT 0,
        sigma_mean REAL NOT NULL DEFAULT 0,
        total_trades INTEGER NOT NULL DEFAULT 0,
        winning_trades INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_strategies_portfolio ON trading_strategies(portfolio_id);
    CREATE TABLE IF NOT EXISTS trades (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        strategy_id INTEGER NOT NULL REFERENCES trading_strategies(id) ON DELETE CASCADE,
        portfolio_id INTEGER NOT NULL REFERENCES portfolios(id) ON DELETE CASCADE,
        symbol TEXT NOT NULL,
        side TEXT NOT NULL CHECK (side IN ('buy', 'sell')),
        quantity REAL NOT NULL,
        price REAL NOT NULL,
        status TEXT NOT NULL CHECK (status IN ('pending', 'filled', 'cancelled')),
        predicted_return REAL NOT NULL,
        confidence REAL NOT NULL,
        alpha_sample REAL NOT NULL DEFAULT 0,
        beta_sample REAL NOT NULL DEFAULT 0,
        executed_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_trades_strategy ON trades(strategy_id);
    CREATE INDEX IF NOT EXISTS idx_trades_portfolio ON trades(portfolio_id);
    CREATE TABLE IF NOT EXISTS market_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        date TEXT NOT NULL,
        open REAL NOT NULL,
        high REAL NOT NULL,
        low REAL NOT NULL,
        close REAL NOT NULL,
        volume INTEGER NOT NULL,
        UNIQUE (symbol, date)
    );
    CREATE INDEX IF NOT EXISTS idx_market_data_date ON market_data(date);";

const PORTFOLIO_COLUMNS: &str = "id, name, description, created_at, updated_at";
const INVESTMENT_COLUMNS: &str = "id, portfolio_id, symbol, name, quantity, purchase_price, \
     purchase_date, current_price, current_value, created_at, updated_at";
const STRATEGY_COLUMNS: &str = "id, portfolio_id, name, description, symbol, \
     confidence_threshold, position_size, max_position_size, is_active, alpha_mean, alpha_std, \
     beta_mean, beta_std, sigma_mean, total_trades, winning_trades, created_at, updated_at";
const TRADE_COLUMNS: &str = "id, strategy_id, portfolio_id, symbol, side, quantity, price, \
     status, predicted_return, confidence, alpha_sample, beta_sample, executed_at";
const MARKET_COLUMNS: &str = "id, symbol, date, open, high, low, close, volume";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantfolioError> {
        let db_path =
            config
                .get_string("database", "path")
                .ok_or_else(|| QuantfolioError::ConfigMissing {
                    section: "database".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("database", "pool_size", 4);
        let pool_size = u32::try_from(pool_size)
            .ok()
            .filter(|&n| (1..=MAX_POOL_SIZE as u32).contains(&n))
            .ok_or_else(|| QuantfolioError::ConfigInvalid {
                section: "database".into(),
                key: "pool_size".into(),
                reason: format!("pool_size must be between 1 and {MAX_POOL_SIZE}, got {pool_size}"),
            })?;

        let manager = SqliteConnectionManager::file(&db_path).with_init(init_connection);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| QuantfolioError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, QuantfolioError> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| QuantfolioError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), QuantfolioError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA).map_err(QuantfolioError::query)?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, QuantfolioError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| QuantfolioError::Database {
                reason: e.to_string(),
            })
    }
}

fn init_connection(conn: &mut Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let value: String = row.get(idx)?;
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn portfolio_from_row(row: &Row<'_>) -> rusqlite::Result<Portfolio> {
    Ok(Portfolio {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: get_ts(row, 3)?,
        updated_at: get_ts(row, 4)?,
    })
}

fn investment_from_row(row: &Row<'_>) -> rusqlite::Result<Investment> {
    Ok(Investment {
        id: row.get(0)?,
        portfolio_id: row.get(1)?,
        symbol: row.get(2)?,
        name: row.get(3)?,
        quantity: row.get(4)?,
        purchase_price: row.get(5)?,
        purchase_date: get_date(row, 6)?,
        current_price: row.get(7)?,
        current_value: row.get(8)?,
        created_at: get_ts(row, 9)?,
        updated_at: get_ts(row, 10)?,
    })
}

fn strategy_from_row(row: &Row<'_>) -> rusqlite::Result<TradingStrategy> {
    Ok(TradingStrategy {
        id: row.get(0)?,
        portfolio_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        symbol: row.get(4)?,
        confidence_threshold: row.get(5)?,
        position_size: row.get(6)?,
        max_position_size: row.get(7)?,
        is_active: row.get(8)?,
        model: ModelParameters {
            alpha_mean: row.get(9)?,
            alpha_std: row.get(10)?,
            beta_mean: row.get(11)?,
            beta_std: row.get(12)?,
            sigma_mean: row.get(13)?,
        },
        total_trades: row.get(14)?,
        winning_trades: row.get(15)?,
        created_at: get_ts(row, 16)?,
        updated_at: get_ts(row, 17)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    let side: String = row.get(4)?;
    let status: String = row.get(7)?;
    Ok(Trade {
        id: row.get(0)?,
        strategy_id: row.get(1)?,
        portfolio_id: row.get(2)?,
        symbol: row.get(3)?,
        side: side.parse().map_err(|e: String| conversion_error(4, e))?,
        quantity: row.get(5)?,
        price: row.get(6)?,
        status: status.parse().map_err(|e: String| conversion_error(7, e))?,
        predicted_return: row.get(8)?,
        confidence: row.get(9)?,
        alpha_sample: row.get(10)?,
        beta_sample: row.get(11)?,
        executed_at: get_ts(row, 12)?,
    })
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<OhlcvBar> {
    Ok(OhlcvBar {
        symbol: row.get(1)?,
        date: get_date(row, 2)?,
        open: row.get(3)?,
        high: row.get(4)?,
        low: row.get(5)?,
        close: row.get(6)?,
        volume: row.get(7)?,
    })
}

fn market_data_from_row(row: &Row<'_>) -> rusqlite::Result<MarketData> {
    Ok(MarketData {
        id: row.get(0)?,
        bar: bar_from_row(row)?,
    })
}

fn fetch_portfolio(conn: &Connection, id: i64) -> Result<Option<Portfolio>, QuantfolioError> {
    conn.query_row(
        &format!("SELECT {PORTFOLIO_COLUMNS} FROM portfolios WHERE id = ?1"),
        params![id],
        portfolio_from_row,
    )
    .optional()
    .map_err(QuantfolioError::query)
}

fn fetch_investment(conn: &Connection, id: i64) -> Result<Option<Investment>, QuantfolioError> {
    conn.query_row(
        &format!("SELECT {INVESTMENT_COLUMNS} FROM investments WHERE id = ?1"),
        params![id],
        investment_from_row,
    )
    .optional()
    .map_err(QuantfolioError::query)
}

fn fetch_strategy(conn: &Connection, id: i64) -> Result<Option<TradingStrategy>, QuantfolioError> {
    conn.query_row(
        &format!("SELECT {STRATEGY_COLUMNS} FROM trading_strategies WHERE id = ?1"),
        params![id],
        strategy_from_row,
    )
    .optional()
    .map_err(QuantfolioError::query)
}

fn fetch_trade(conn: &Connection, id: i64) -> Result<Option<Trade>, QuantfolioError> {
    conn.query_row(
        &format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = ?1"),
        params![id],
        trade_from_row,
    )
    .optional()
    .map_err(QuantfolioError::query)
}

fn require_portfolio(conn: &Connection, id: i64) -> Result<(), QuantfolioError> {
    match fetch_portfolio(conn, id)? {
        Some(_) => Ok(()),
        None => Err(QuantfolioError::NotFound {
            entity: "portfolio",
            id,
        }),
    }
}

/// Reads back a row that was just written on the same connection.
fn inserted<T>(row: Option<T>, entity: &'static str, id: i64) -> Result<T, QuantfolioError> {
    row.ok_or(QuantfolioError::NotFound { entity, id })
}

impl StorePort for SqliteAdapter {
    fn create_portfolio(&self, input: &NewPortfolio) -> Result<Portfolio, QuantfolioError> {
        validate_new_portfolio(input)?;
        let conn = self.conn()?;
        let now = format_ts(&Utc::now());
        conn.execute(
            "INSERT INTO portfolios (name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![
                input.name.trim(),
                input.description.as_deref().unwrap_or_default(),
                now
            ],
        )
        .map_err(QuantfolioError::query)?;
        let id = conn.last_insert_rowid();
        debug!(portfolio_id = id, "created portfolio");
        inserted(fetch_portfolio(&conn, id)?, "portfolio", id)
    }

    fn get_portfolio(&self, id: i64) -> Result<Option<Portfolio>, QuantfolioError> {
        let conn = self.conn()?;
        fetch_portfolio(&conn, id)
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PORTFOLIO_COLUMNS} FROM portfolios ORDER BY id"
            ))
            .map_err(QuantfolioError::query)?;
        let rows = stmt
            .query_map([], portfolio_from_row)
            .map_err(QuantfolioError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(QuantfolioError::query)
    }

    fn delete_portfolio(&self, id: i64) -> Result<bool, QuantfolioError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM portfolios WHERE id = ?1", params![id])
            .map_err(QuantfolioError::query)?;
        debug!(portfolio_id = id, deleted, "deleted portfolio");
        Ok(deleted > 0)
    }

    fn portfolio_value(&self, id: i64) -> Result<f64, QuantfolioError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT COALESCE(SUM(current_value), 0.0) FROM investments WHERE portfolio_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .map_err(QuantfolioError::query)
    }

    fn add_investment(
        &self,
        portfolio_id: i64,
        input: &NewInvestment,
    ) -> Result<Investment, QuantfolioError> {
        validate_new_investment(input)?;
        let symbol = normalize_symbol(&input.symbol)?;
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .unwrap_or(symbol.as_str())
            .to_string();
        let current_price = input.current_price.unwrap_or(0.0);

        let conn = self.conn()?;
        require_portfolio(&conn, portfolio_id)?;
        let now = format_ts(&Utc::now());
        conn.execute(
            "INSERT INTO investments (portfolio_id, symbol, name, quantity, purchase_price,
                 purchase_date, current_price, current_value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                portfolio_id,
                symbol,
                name,
                input.quantity,
                input.purchase_price,
                input.purchase_date.format(DATE_FORMAT).to_string(),
                current_price,
                input.quantity * current_price,
                now
            ],
        )
        .map_err(QuantfolioError::query)?;
        let id = conn.last_insert_rowid();
        inserted(fetch_investment(&conn, id)?, "investment", id)
    }

    fn get_investment(&self, id: i64) -> Result<Option<Investment>, QuantfolioError> {
        let conn = self.conn()?;
        fetch_investment(&conn, id)
    }

    fn list_investments(&self, portfolio_id: i64) -> Result<Vec<Investment>, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {INVESTMENT_COLUMNS} FROM investments WHERE portfolio_id = ?1 ORDER BY id"
            ))
            .map_err(QuantfolioError::query)?;
        let rows = stmt
            .query_map(params![portfolio_id], investment_from_row)
            .map_err(QuantfolioError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(QuantfolioError::query)
    }

    fn update_investment_price(
        &self,
        id: i64,
        price: f64,
    ) -> Result<Option<Investment>, QuantfolioError> {
        validate_price(price)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(QuantfolioError::query)?;

        let Some(mut investment) = fetch_investment(&tx, id)? else {
            return Ok(None);
        };
        investment.update_current_value(price);
        tx.execute(
            "UPDATE investments SET current_price = ?1, current_value = ?2, updated_at = ?3
             WHERE id = ?4",
            params![
                investment.current_price,
                investment.current_value,
                format_ts(&investment.updated_at),
                id
            ],
        )
        .map_err(QuantfolioError::query)?;
        let updated = fetch_investment(&tx, id)?;
        tx.commit().map_err(QuantfolioError::query)?;
        Ok(updated)
    }

    fn delete_investment(&self, id: i64) -> Result<bool, QuantfolioError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute("DELETE FROM investments WHERE id = ?1", params![id])
            .map_err(QuantfolioError::query)?;
        Ok(deleted > 0)
    }

    fn create_strategy(&self, input: &NewStrategy) -> Result<TradingStrategy, QuantfolioError> {
        validate_new_strategy(input)?;
        let symbol = normalize_symbol(&input.symbol)?;

        let conn = self.conn()?;
        require_portfolio(&conn, input.portfolio_id)?;
        let now = format_ts(&Utc::now());
        conn.execute(
            "INSERT INTO trading_strategies (portfolio_id, name, description, symbol,
                 confidence_threshold, position_size, max_position_size, is_active,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                input.portfolio_id,
                input.name.trim(),
                input.description.as_deref().unwrap_or_default(),
                symbol,
                input.confidence_threshold,
                input.position_size,
                input.max_position_size,
                input.is_active,
                now
            ],
        )
        .map_err(QuantfolioError::query)?;
        let id = conn.last_insert_rowid();
        debug!(strategy_id = id, symbol = %symbol, "created strategy");
        inserted(fetch_strategy(&conn, id)?, "strategy", id)
    }

    fn get_strategy(&self, id: i64) -> Result<Option<TradingStrategy>, QuantfolioError> {
        let conn = self.conn()?;
        fetch_strategy(&conn, id)
    }

    fn list_strategies(
        &self,
        portfolio_id: Option<i64>,
    ) -> Result<Vec<TradingStrategy>, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {STRATEGY_COLUMNS} FROM trading_strategies
                 WHERE (?1 IS NULL OR portfolio_id = ?1) ORDER BY id"
            ))
            .map_err(QuantfolioError::query)?;
        let rows = stmt
            .query_map(params![portfolio_id], strategy_from_row)
            .map_err(QuantfolioError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(QuantfolioError::query)
    }

    fn update_strategy_model(
        &self,
        id: i64,
        params: &ModelParameters,
    ) -> Result<(), QuantfolioError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE trading_strategies
                 SET alpha_mean = ?1, alpha_std = ?2, beta_mean = ?3, beta_std = ?4,
                     sigma_mean = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    params.alpha_mean,
                    params.alpha_std,
                    params.beta_mean,
                    params.beta_std,
                    params.sigma_mean,
                    format_ts(&Utc::now()),
                    id
                ],
            )
            .map_err(QuantfolioError::query)?;
        if updated == 0 {
            return Err(QuantfolioError::NotFound {
                entity: "strategy",
                id,
            });
        }
        Ok(())
    }

    fn record_trade(&self, trade: &NewTrade, winning: bool) -> Result<Trade, QuantfolioError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(QuantfolioError::query)?;
        let now = format_ts(&Utc::now());

        tx.execute(
            "INSERT INTO trades (strategy_id, portfolio_id, symbol, side, quantity, price,
                 status, predicted_return, confidence, alpha_sample, beta_sample, executed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0.0, 0.0, ?10)",
            params![
                trade.strategy_id,
                trade.portfolio_id,
                trade.symbol,
                trade.side.as_str(),
                trade.quantity,
                trade.price,
                trade.status.as_str(),
                trade.predicted_return,
                trade.confidence,
                now
            ],
        )
        .map_err(QuantfolioError::query)?;
        let id = tx.last_insert_rowid();

        let updated = tx
            .execute(
                "UPDATE trading_strategies
                 SET total_trades = total_trades + 1,
                     winning_trades = winning_trades + ?1,
                     updated_at = ?2
                 WHERE id = ?3",
                params![i64::from(winning), now, trade.strategy_id],
            )
            .map_err(QuantfolioError::query)?;
        if updated == 0 {
            return Err(QuantfolioError::NotFound {
                entity: "strategy",
                id: trade.strategy_id,
            });
        }

        let booked = inserted(fetch_trade(&tx, id)?, "trade", id)?;
        tx.commit().map_err(QuantfolioError::query)?;
        Ok(booked)
    }

    fn list_trades(
        &self,
        filter: TradeFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Trade>, QuantfolioError> {
        let conn = self.conn()?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TRADE_COLUMNS} FROM trades
                 WHERE (?1 IS NULL OR strategy_id = ?1) AND (?2 IS NULL OR portfolio_id = ?2)
                 ORDER BY executed_at DESC, id DESC
                 LIMIT ?3"
            ))
            .map_err(QuantfolioError::query)?;
        let rows = stmt
            .query_map(
                params![filter.strategy_id, filter.portfolio_id, limit],
                trade_from_row,
            )
            .map_err(QuantfolioError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(QuantfolioError::query)
    }

    fn upsert_market_data(&self, bars: &[OhlcvBar]) -> Result<usize, QuantfolioError> {
        for bar in bars {
            validate_bar(bar)?;
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(QuantfolioError::query)?;
        for bar in bars {
            tx.execute(
                "INSERT INTO market_data (symbol, date, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (symbol, date) DO UPDATE SET
                     open = excluded.open, high = excluded.high, low = excluded.low,
                     close = excluded.close, volume = excluded.volume",
                params![
                    normalize_symbol(&bar.symbol)?,
                    bar.date.format(DATE_FORMAT).to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                ],
            )
            .map_err(QuantfolioError::query)?;
        }
        tx.commit().map_err(QuantfolioError::query)?;
        Ok(bars.len())
    }

    fn recent_market_data(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<OhlcvBar>, QuantfolioError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MARKET_COLUMNS} FROM market_data
                 WHERE symbol = ?1 ORDER BY date DESC LIMIT ?2"
            ))
            .map_err(QuantfolioError::query)?;
        let rows = stmt
            .query_map(
                params![symbol.trim().to_uppercase(), limit as i64],
                bar_from_row,
            )
            .map_err(QuantfolioError::query)?;
        let mut bars = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(QuantfolioError::query)?;
        bars.reverse();
        Ok(bars)
    }

    fn list_market_data(
        &self,
        symbol: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MarketData>, QuantfolioError> {
        let conn = self.conn()?;
        let symbol = symbol.map(|s| s.trim().to_uppercase());
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MARKET_COLUMNS} FROM market_data
                 WHERE (?1 IS NULL OR symbol = ?1)
                 ORDER BY date DESC, symbol LIMIT ?2"
            ))
            .map_err(QuantfolioError::query)?;
        let rows = stmt
            .query_map(params![symbol, limit as i64], market_data_from_row)
            .map_err(QuantfolioError::query)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(QuantfolioError::query)
    }

    fn latest_close(&self, symbol: &str) -> Result<Option<f64>, QuantfolioError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT close FROM market_data WHERE symbol = ?1 ORDER BY date DESC LIMIT 1",
            params![symbol.trim().to_uppercase()],
            |row| row.get(0),
        )
        .optional()
        .map_err(QuantfolioError::query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade::{TradeSide, TradeStatus};

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn store() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(symbol: &str, day: u32, close: f64) -> OhlcvBar {
        OhlcvBar {
            symbol: symbol.to_string(),
            date: date(2024, 1, day),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    fn portfolio(adapter: &SqliteAdapter) -> Portfolio {
        adapter
            .create_portfolio(&NewPortfolio {
                name: "Core".into(),
                description: Some("core holdings".into()),
            })
            .unwrap()
    }

    fn strategy_input(portfolio_id: i64) -> NewStrategy {
        NewStrategy {
            portfolio_id,
            name: "AAPL trend".into(),
            description: None,
            symbol: "aapl".into(),
            confidence_threshold: 0.5,
            position_size: 0.1,
            max_position_size: 0.2,
            is_active: true,
        }
    }

    #[test]
    fn from_config_missing_path() {
        let config = EmptyConfig;
        let result = SqliteAdapter::from_config(&config);
        match result {
            Err(QuantfolioError::ConfigMissing { section, key }) => {
                assert_eq!(section, "database");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn from_config_rejects_pool_size_out_of_range() {
        use crate::adapters::file_config_adapter::FileConfigAdapter;

        for size in ["0", "-3", "4294967296"] {
            let config = FileConfigAdapter::from_string(&format!(
                "[database]\npath = unused.db\npool_size = {size}\n"
            ))
            .unwrap();
            match SqliteAdapter::from_config(&config) {
                Err(QuantfolioError::ConfigInvalid { key, .. }) => assert_eq!(key, "pool_size"),
                Err(other) => panic!("expected ConfigInvalid for {size}, got: {other}"),
                Ok(_) => panic!("expected error for pool_size {size}"),
            }
        }
    }

    #[test]
    fn schema_initialization_is_idempotent() {
        let adapter = store();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn create_and_get_portfolio() {
        let adapter = store();
        let created = portfolio(&adapter);
        assert_eq!(created.name, "Core");
        assert_eq!(created.description, "core holdings");

        let fetched = adapter.get_portfolio(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(adapter.get_portfolio(created.id + 1).unwrap().is_none());
    }

    #[test]
    fn create_portfolio_rejects_blank_name() {
        let adapter = store();
        let result = adapter.create_portfolio(&NewPortfolio {
            name: " ".into(),
            description: None,
        });
        assert!(matches!(result, Err(QuantfolioError::Validation { .. })));
    }

    #[test]
    fn investments_value_the_portfolio() {
        let adapter = store();
        let p = portfolio(&adapter);
        adapter
            .add_investment(
                p.id,
                &NewInvestment {
                    symbol: "aapl".into(),
                    name: Some("Apple".into()),
                    quantity: 10.0,
                    purchase_price: 150.0,
                    purchase_date: date(2024, 1, 2),
                    current_price: Some(160.0),
                },
            )
            .unwrap();
        let inv = adapter
            .add_investment(
                p.id,
                &NewInvestment {
                    symbol: "MSFT".into(),
                    name: None,
                    quantity: 2.0,
                    purchase_price: 300.0,
                    purchase_date: date(2024, 1, 3),
                    current_price: None,
                },
            )
            .unwrap();
        assert_eq!(inv.name, "MSFT");
        assert_eq!(inv.current_price, 0.0);
        assert_eq!(inv.current_value, 0.0);

        assert!((adapter.portfolio_value(p.id).unwrap() - 1600.0).abs() < 1e-9);
        let listed = adapter.list_investments(p.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].symbol, "AAPL");
    }

    #[test]
    fn add_investment_to_missing_portfolio() {
        let adapter = store();
        let result = adapter.add_investment(
            42,
            &NewInvestment {
                symbol: "AAPL".into(),
                name: None,
                quantity: 1.0,
                purchase_price: 1.0,
                purchase_date: date(2024, 1, 2),
                current_price: None,
            },
        );
        assert!(matches!(
            result,
            Err(QuantfolioError::NotFound {
                entity: "portfolio",
                id: 42
            })
        ));
    }

    #[test]
    fn update_investment_price_recomputes_value() {
        let adapter = store();
        let p = portfolio(&adapter);
        let inv = adapter
            .add_investment(
                p.id,
                &NewInvestment {
                    symbol: "AAPL".into(),
                    name: None,
                    quantity: 4.0,
                    purchase_price: 100.0,
                    purchase_date: date(2024, 1, 2),
                    current_price: None,
                },
            )
            .unwrap();

        let updated = adapter.update_investment_price(inv.id, 125.0).unwrap().unwrap();
        assert_eq!(updated.current_price, 125.0);
        assert_eq!(updated.current_value, 500.0);
        assert!(adapter.update_investment_price(999, 1.0).unwrap().is_none());
    }

    #[test]
    fn strategy_model_and_counters() {
        let adapter = store();
        let p = portfolio(&adapter);
        let s = adapter.create_strategy(&strategy_input(p.id)).unwrap();
        assert_eq!(s.symbol, "AAPL");
        assert_eq!(s.total_trades, 0);

        let params = ModelParameters {
            alpha_mean: 0.1,
            alpha_std: 0.02,
            beta_mean: 0.003,
            beta_std: 0.02,
            sigma_mean: 0.4,
        };
        adapter.update_strategy_model(s.id, &params).unwrap();

        let trade = adapter
            .record_trade(
                &NewTrade {
                    strategy_id: s.id,
                    portfolio_id: p.id,
                    symbol: "AAPL".into(),
                    side: TradeSide::Buy,
                    quantity: 3.0,
                    price: 190.0,
                    status: TradeStatus::Filled,
                    predicted_return: 0.2,
                    confidence: 0.3,
                },
                true,
            )
            .unwrap();
        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.status, TradeStatus::Filled);
        assert_eq!(trade.alpha_sample, 0.0);

        let reloaded = adapter.get_strategy(s.id).unwrap().unwrap();
        assert_eq!(reloaded.model, params);
        assert_eq!(reloaded.total_trades, 1);
        assert_eq!(reloaded.winning_trades, 1);
    }

    #[test]
    fn update_model_of_missing_strategy() {
        let adapter = store();
        let result = adapter.update_strategy_model(5, &ModelParameters::default());
        assert!(matches!(result, Err(QuantfolioError::NotFound { .. })));
    }

    #[test]
    fn upsert_replaces_existing_bar() {
        let adapter = store();
        adapter
            .upsert_market_data(&[bar("AAPL", 1, 100.0), bar("AAPL", 2, 101.0)])
            .unwrap();
        adapter.upsert_market_data(&[bar("AAPL", 2, 105.0)]).unwrap();

        let rows = adapter.list_market_data(Some("AAPL"), 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bar.date, date(2024, 1, 2));
        assert_eq!(rows[0].bar.close, 105.0);
        assert_eq!(adapter.latest_close("aapl").unwrap(), Some(105.0));
    }

    #[test]
    fn recent_market_data_is_ascending_and_limited() {
        let adapter = store();
        let bars: Vec<OhlcvBar> = (1..=5).map(|d| bar("MSFT", d, 300.0 + d as f64)).collect();
        adapter.upsert_market_data(&bars).unwrap();
        adapter.upsert_market_data(&[bar("AAPL", 9, 1.0)]).unwrap();

        let recent = adapter.recent_market_data("MSFT", 3).unwrap();
        let days: Vec<NaiveDate> = recent.iter().map(|b| b.date).collect();
        assert_eq!(days, vec![date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5)]);
    }

    #[test]
    fn latest_close_unknown_symbol() {
        let adapter = store();
        assert_eq!(adapter.latest_close("ZZZ").unwrap(), None);
    }

    #[test]
    fn invalid_bar_is_rejected_before_writing() {
        let adapter = store();
        let mut bad = bar("AAPL", 2, 10.0);
        bad.high = 1.0;
        assert!(adapter
            .upsert_market_data(&[bar("AAPL", 1, 10.0), bad])
            .is_err());
        assert!(adapter.list_market_data(None, 10).unwrap().is_empty());
    }
}
