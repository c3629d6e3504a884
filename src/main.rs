//! appwire - connection factory and report publishing tools
//!
//! Creates connections from secrets, inspects static asset releases and
//! publishes reports from the command line.

use anyhow::Result;
use appwire::cli::{
    AssetsSubcommand, ConfigSubcommand, ConnectArgs, display_version, handle_assets_command,
    handle_config_command, handle_connect_command, init_logging,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// appwire - connection factory and report publishing tools
#[derive(Parser, Debug)]
#[command(name = "appwire")]
#[command(about = "Connection factory and static asset publishing for interactive app runtimes", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Create a connection and check that it is healthy
    ///
    /// The built-in `sql` and `snowpark` types need a query driver module,
    /// which only an embedding application can register. Without one the
    /// command reports which package is missing.
    Connect(ConnectArgs),
    /// Static asset and report publishing
    Assets {
        #[command(subcommand)]
        subcommand: AssetsSubcommand,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.debug, args.log_file.as_deref())?;
    tracing::debug!("Debug logging enabled");

    match args.command {
        Command::Connect(connect) => handle_connect_command(connect).await,
        Command::Assets { subcommand } => handle_assets_command(subcommand).await,
        Command::Config { subcommand } => handle_config_command(subcommand).await,
        Command::Version => {
            display_version();
            Ok(())
        }
    }
}
