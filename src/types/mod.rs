//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account variants and persisted account state
//! - `user`: Users, roles and capabilities
//! - `transaction`: Transaction records and identifiers
//! - `error`: Error types for the banking ledger

pub mod account;
pub mod error;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountKind};
pub use error::BankError;
pub use transaction::{AccountId, TransactionId, TransactionRecord, UserId};
pub use user::{User, UserRole};
