//! Ledger persistence
//!
//! The [`LedgerStore`] trait is the seam between the core and its
//! persistence: users, accounts and the transaction log live behind it, and
//! every balance mutation goes through one of the two atomic entry points.
//!
//! Two implementations are provided:
//! - [`MemoryLedger`] - mutex-guarded in-memory state, the test vehicle
//! - [`SledLedger`] - durable storage on a `sled` database
//!
//! Neither implementation provides multi-statement isolation across separate
//! calls; the transfer engine serializes all mutating operations behind its
//! own exclusion boundary.

pub mod memory;
pub mod sled_store;

pub use memory::MemoryLedger;
pub use sled_store::SledLedger;

use crate::types::{Account, AccountId, AccountKind, BankError, TransactionRecord, User, UserId, UserRole};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Durable storage of users, accounts and the transaction log
///
/// Account and transaction identifiers are assigned by the store. The two
/// `atomic_*` operations are all-or-nothing: on any failure no partial
/// balance change is observable.
pub trait LedgerStore: Send + Sync {
    /// Register a user
    ///
    /// # Errors
    ///
    /// Returns `UserAlreadyExists` if the id is taken.
    fn insert_user(&self, user: User) -> Result<(), BankError>;

    /// Look up a user by id
    fn user(&self, id: UserId) -> Result<Option<User>, BankError>;

    /// Change a user's role
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    fn set_user_role(&self, id: UserId, role: UserRole) -> Result<(), BankError>;

    /// Change a user's child flag
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    fn set_user_child_flag(&self, id: UserId, is_child: bool) -> Result<(), BankError>;

    /// Change a user's display name
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    fn set_user_name(&self, id: UserId, name: String) -> Result<(), BankError>;

    /// Create an account and assign its id
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the owning user does not exist.
    fn insert_account(
        &self,
        user: UserId,
        kind: AccountKind,
        opening_balance: Decimal,
        spending_limit: Option<Decimal>,
        opened_at: DateTime<Utc>,
    ) -> Result<Account, BankError>;

    /// Look up an account by id
    fn account(&self, id: AccountId) -> Result<Option<Account>, BankError>;

    /// Whether an account exists
    fn account_exists(&self, id: AccountId) -> Result<bool, BankError>;

    /// The current persisted balance of an account
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    fn balance(&self, id: AccountId) -> Result<Decimal, BankError>;

    /// All accounts owned by a user, ordered by account id
    fn accounts_for_user(&self, user: UserId) -> Result<Vec<Account>, BankError>;

    /// All accounts whose variant accrues interest, ordered by account id
    fn interest_bearing_accounts(&self) -> Result<Vec<Account>, BankError>;

    /// Set or clear an account's explicit spending limit
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    fn set_spending_limit(
        &self,
        id: AccountId,
        limit: Option<Decimal>,
    ) -> Result<(), BankError>;

    /// Delete an account and its transactions
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist and
    /// `BalanceNotZero` unless the balance is exactly zero.
    fn delete_account(&self, id: AccountId) -> Result<(), BankError>;

    /// Move `amount` from one account to another as a single atomic unit
    ///
    /// Re-reads both balances, applies the debit and credit, and appends the
    /// transaction record; either everything commits or nothing does.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if `from` does not exist,
    /// `RecipientNotFound` if `to` does not exist, `InvalidAmount` if the
    /// amount is not positive, and `TransferFailed` for storage failures
    /// (after rollback).
    fn atomic_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError>;

    /// Apply a signed balance delta to one account as a single atomic unit
    ///
    /// The restricted path for interest postings: the record is
    /// self-referential (`from == to`) and the delta may carry either sign.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist and
    /// `TransferFailed` for storage failures (after rollback).
    fn atomic_self_credit(
        &self,
        account: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError>;

    /// All transactions touching an account, timestamp ascending
    ///
    /// A restartable read over committed records, not a live stream.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    fn history(&self, account: AccountId) -> Result<Vec<TransactionRecord>, BankError>;
}
