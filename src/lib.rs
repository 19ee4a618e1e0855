pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::portfolio::RowFields;
use crate::core::service::CoinService;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Commands dispatched by `run_command`.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Init,
    List,
    Add {
        coin: String,
        fields: RowFields,
    },
    Edit {
        id: u64,
        coin: String,
        fields: RowFields,
    },
    Remove {
        id: u64,
    },
    Resolve {
        text: String,
    },
    Summary {
        json: bool,
    },
    Prices {
        json: bool,
    },
    Watch {
        interval: Duration,
        iterations: Option<u64>,
    },
    Popular,
}

/// Wires the CoinGecko provider and the on-disk store into a service.
pub fn build_service(config: &AppConfig) -> Result<CoinService> {
    let gecko = &config.providers.coingecko;
    let api = providers::CoinGeckoProvider::new(
        &gecko.base_url,
        gecko.api_key.as_deref(),
        Duration::from_secs(gecko.timeout_secs),
    )?;
    let data_path = config.default_data_path()?;
    debug!(path = %data_path.display(), "Opening portfolio store");
    let store = store::DiskPortfolioStore::open(&data_path)?;

    Ok(CoinService::with_system_clock(
        Arc::new(api),
        Arc::new(store),
        config,
    ))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("coinwatch starting...");

    if let AppCommand::Popular = command {
        cli::manage::popular();
        return Ok(());
    }

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let service = build_service(&config)?;
    match command {
        AppCommand::Init => cli::manage::init(&service).await,
        AppCommand::List => cli::manage::list(&service).await,
        AppCommand::Add { coin, fields } => cli::manage::add(&service, &coin, fields).await,
        AppCommand::Edit { id, coin, fields } => {
            cli::manage::edit(&service, id, &coin, fields).await
        }
        AppCommand::Remove { id } => cli::manage::remove(&service, id).await,
        AppCommand::Resolve { text } => cli::manage::resolve(&service, &text).await,
        AppCommand::Summary { json } => cli::summary::run(&service, json).await,
        AppCommand::Prices { json } => cli::prices::run(&service, json).await,
        AppCommand::Watch {
            interval,
            iterations,
        } => cli::summary::watch(&service, interval, iterations).await,
        AppCommand::Popular => Ok(()),
    }
}
