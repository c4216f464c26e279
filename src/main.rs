use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use nalo_sync::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for nalo_sync::AppCommand {
    fn from(cmd: Commands) -> nalo_sync::AppCommand {
        match cmd {
            Commands::Sync => nalo_sync::AppCommand::Sync,
            Commands::Accounts => nalo_sync::AppCommand::Accounts,
            Commands::Extract { pdf } => nalo_sync::AppCommand::Extract(pdf),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Download documents, accounts and balances from Nalo
    Sync,
    /// Display saved accounts and their latest balance
    Accounts,
    /// Show the bill fields found in a local PDF
    Extract {
        /// Path to the PDF document
        pdf: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => nalo_sync::cli::setup::setup(),
        Some(cmd) => nalo_sync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
