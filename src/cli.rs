//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteAdapter;
use crate::domain::config_validation::validate_app_config;
use crate::domain::error::QuantfolioError;
use crate::domain::trading::{TradingService, DEFAULT_LOOKBACK_DAYS};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataSource;
use crate::ports::store_port::StorePort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

#[derive(Parser, Debug)]
#[command(
    name = "quantfolio",
    about = "Investment portfolio tracker with paper trading strategies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the database schema
    InitDb {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load daily bars for one symbol from a CSV file
    ImportMarketData {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Run a trading strategy once and print the result as JSON
    RunStrategy {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: i64,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::InitDb { config } => run_init_db(&config),
        Command::ImportMarketData {
            config,
            symbol,
            file,
        } => run_import_market_data(&config, &symbol, &file),
        Command::RunStrategy { config, id } => run_strategy(&config, id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// Loads and validates the INI file.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantfolioError> {
    eprintln!("Loading config from {}", path.display());
    let config = FileConfigAdapter::from_file(path)?;
    validate_app_config(&config)?;
    Ok(config)
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteAdapter, QuantfolioError> {
    let store = SqliteAdapter::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

fn lookback_days(config: &dyn ConfigPort) -> usize {
    config
        .get_int("trading", "lookback_days", DEFAULT_LOOKBACK_DAYS as i64)
        .max(0) as usize
}

/// The broker data client, when credentials are configured.
pub fn open_market_source(
    config: &dyn ConfigPort,
) -> Result<Option<Arc<dyn MarketDataSource + Send + Sync>>, QuantfolioError> {
    #[cfg(feature = "alpaca")]
    {
        use crate::adapters::alpaca_adapter::AlpacaAdapter;

        if let Some(adapter) = AlpacaAdapter::from_config(config)? {
            info!("using Alpaca market data");
            return Ok(Some(Arc::new(adapter)));
        }
    }
    #[cfg(not(feature = "alpaca"))]
    let _ = config;

    info!("no broker credentials, using stored market data");
    Ok(None)
}

fn run_init_db(config_path: &Path) -> Result<(), QuantfolioError> {
    let config = load_config(config_path)?;
    open_store(&config)?;
    eprintln!("Database schema ready");
    Ok(())
}

fn run_import_market_data(
    config_path: &Path,
    symbol: &str,
    file: &Path,
) -> Result<(), QuantfolioError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    eprintln!("Reading {}", file.display());
    let bars = CsvAdapter::new(file).read_bars(symbol)?;
    if bars.is_empty() {
        return Err(QuantfolioError::validation(format!(
            "{} contains no rows",
            file.display()
        )));
    }

    let stored = store.upsert_market_data(&bars)?;
    eprintln!("Imported {stored} bars for {}", bars[0].symbol);
    Ok(())
}

fn run_strategy(config_path: &Path, id: i64) -> Result<(), QuantfolioError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let source = open_market_source(&config)?;

    let result = TradingService::new(
        &store,
        source.as_deref().map(|s| s as &dyn MarketDataSource),
    )
    .with_lookback_days(lookback_days(&config))
    .run_strategy(id)?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| QuantfolioError::Io(std::io::Error::other(e)))?;
    println!("{json}");
    Ok(())
}

fn run_serve(config_path: &Path) -> Result<(), QuantfolioError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{build_router, AppState};
        use std::net::SocketAddr;

        let config = load_config(config_path)?;
        let store: Arc<dyn StorePort + Send + Sync> = Arc::new(open_store(&config)?);
        let source = open_market_source(&config)?;

        let listen = config
            .get_string("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = listen
            .parse()
            .map_err(|e: std::net::AddrParseError| QuantfolioError::ConfigInvalid {
                section: "web".into(),
                key: "listen".into(),
                reason: e.to_string(),
            })?;

        let mut state = AppState::new(store).with_lookback_days(lookback_days(&config));
        if let Some(source) = &source {
            state = state.with_market_source(Arc::clone(source));
        }
        let router = build_router(state);

        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "web server listening");
            eprintln!("Listening on http://{addr}");
            axum::serve(listener, router).await
        })?;

        // The blocking broker client must be released outside the runtime.
        drop(source);
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        Err(QuantfolioError::validation(
            "the web feature is required for serve",
        ))
    }
}
