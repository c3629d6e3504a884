//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod assets;
mod config;
mod connect;
mod logging;
mod version;

pub use assets::{AssetsSubcommand, handle_assets_command};
pub use config::{ConfigSubcommand, handle_config_command};
pub use connect::{ConnectArgs, handle_connect_command, parse_param};
pub use logging::*;
pub use version::display_version;
