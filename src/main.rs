#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod bot;
mod cli;
mod config;
mod db;
mod discord;
mod utils;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    utils::logging::init_tracing();

    let cli = cli::Cli::parse();
    let config = Arc::new(Config::load_from_file(&cli.config)?);
    info!("community bot starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;

    let core = Arc::new(bot::BotCore::new(config.clone(), db_manager.clone()));
    let gateway = discord::Gateway::new(config.clone(), core.clone());

    let gateway_handle = tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            error!("gateway error: {}", e);
        }
    });

    tokio::select! {
        _ = gateway_handle => {},
        _ = tokio::signal::ctrl_c() => {},
    }

    core.shutdown();
    info!("community bot shutting down");
    Ok(())
}
