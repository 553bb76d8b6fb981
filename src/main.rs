//! Banking Ledger CLI
//!
//! Starts the ledger with its accrual scheduler and the console front end.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --config config.json --store bank.db
//! cargo run -- --memory
//! ```
//!
//! The configuration file is created with default values if it does not
//! exist. Logging is controlled through `RUST_LOG` (default `info`).
//!
//! # Exit codes
//!
//! - 0: Success
//! - 1: Error (store unavailable, startup failure)

use bank_ledger::cli::{self, console};
use bank_ledger::clock::SystemClock;
use bank_ledger::config::ConfigProvider;
use bank_ledger::core::{AccrualScheduler, Bank};
use bank_ledger::store::{LedgerStore, MemoryLedger, SledLedger};
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = cli::parse_args();
    let config = Arc::new(ConfigProvider::from_file(&args.config));

    let store: Arc<dyn LedgerStore> = if args.memory {
        Arc::new(MemoryLedger::new())
    } else {
        match SledLedger::open(&args.store) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                eprintln!("Error opening ledger store: {}", e);
                process::exit(1);
            }
        }
    };

    let bank = match Bank::new(store, config, Arc::new(SystemClock)) {
        Ok(bank) => Arc::new(bank),
        Err(e) => {
            eprintln!("Error starting bank: {}", e);
            process::exit(1);
        }
    };

    let scheduler = AccrualScheduler::spawn(bank.clone());

    if let Err(e) = console::run(bank).await {
        eprintln!("Error: {}", e);
    }

    scheduler.shutdown().await;
}
