pub mod cli;
pub mod core;
pub mod providers;
pub mod store;
pub mod sync;

use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Sync,
    Accounts,
    Extract(PathBuf),
}

fn load_config(config_path: Option<&str>) -> Result<crate::core::config::AppConfig> {
    let config = match config_path {
        Some(path) => crate::core::config::AppConfig::load_from_path(path)?,
        None => crate::core::config::AppConfig::load()?,
    };
    debug!(
        login = ?config.login,
        base_url = %config.provider.base_url,
        data_path = ?config.data_path,
        "Loaded config"
    );
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Nalo sync starting...");

    match command {
        AppCommand::Sync => {
            let config = load_config(config_path)?;
            cli::sync::run(&config).await
        }
        AppCommand::Accounts => {
            let config = load_config(config_path)?;
            let store = store::open_store(&config)?;
            cli::accounts::run(&store).await
        }
        AppCommand::Extract(path) => cli::extract::run(&crate::core::PdfExtractReader, &path),
    }
}
