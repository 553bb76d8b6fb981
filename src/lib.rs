//! Banking Ledger Library
//! # Overview
//!
//! A small multi-account banking ledger: users own typed accounts (debit,
//! credit, saving, child-saving), accounts transfer funds to each other, and
//! interest accrues periodically on credit and savings balances from a
//! time-weighted average of the balance history.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, User, TransactionRecord, errors)
//! - [`config`] - Configuration loading and the read-only provider
//! - [`clock`] - Injectable time source
//! - [`store`] - Ledger persistence behind the `LedgerStore` trait
//!   (in-memory and sled-backed implementations)
//! - [`core`] - Business logic:
//!   - [`core::policy`] - Per-variant transfer rules, caps and interest rules
//!   - [`core::history`] - Balance sampling and the time-weighted average
//!   - [`core::engine`] - Serialized atomic balance mutations
//!   - [`core::bank`] - The facade tying everything together
//!   - [`core::accrual`] - The periodic accrual scheduler
//! - [`io`] - CSV export of transaction histories
//! - [`cli`] - Argument parsing and the console front end
//!
//! # Account variants
//!
//! - **Debit**: no overdraft, no interest
//! - **Credit**: may overdraw to its effective limit; charged monthly
//!   interest while the average balance is negative
//! - **Saving**: earns monthly interest on the average balance
//! - **ChildSaving**: a saving account with hard per-transfer and daily
//!   spending caps
//!
//! # Concurrency
//!
//! Foreground transfers and the background accrual scheduler mutate the same
//! persisted balances. Every mutation runs as an atomic unit behind the
//! transfer engine's exclusion boundary, so concurrent writers serialize
//! instead of losing updates.

// Module declarations
pub mod cli;
pub mod clock;
pub mod config;
pub mod core;
pub mod io;
pub mod store;
pub mod types;

pub use crate::core::{AccrualScheduler, Bank, BalanceHistory, SchedulerHandle, TransferEngine};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BankConfig, ConfigProvider};
pub use io::write_history_csv;
pub use store::{LedgerStore, MemoryLedger, SledLedger};
pub use types::{
    Account, AccountId, AccountKind, BankError, TransactionId, TransactionRecord, User, UserId,
    UserRole,
};
