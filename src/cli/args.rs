use clap::Parser;
use std::path::PathBuf;

/// Run the banking ledger with its console front end
#[derive(Parser, Debug)]
#[command(name = "bank-ledger")]
#[command(about = "Multi-account banking ledger with periodic interest accrual", long_about = None)]
pub struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(
        long = "config",
        value_name = "FILE",
        default_value = "config.json",
        help = "Configuration file (created with defaults if missing)"
    )]
    pub config: PathBuf,

    /// Directory of the durable ledger database
    #[arg(
        long = "store",
        value_name = "DIR",
        default_value = "bank.db",
        help = "Ledger database directory"
    )]
    pub store: PathBuf,

    /// Keep the ledger in memory instead of on disk
    #[arg(long, help = "Use a non-durable in-memory ledger")]
    pub memory: bool,
}

/// Parse command-line arguments
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
