//! Error types for the banking ledger
//!
//! This module defines all error conditions the core can signal. Each kind
//! is a distinguishable variant so callers can branch on it rather than on a
//! generic failure flag.
//!
//! # Error categories
//!
//! - **Validation errors**: rejected before any balance is touched; the
//!   caller may correct the input and retry (`InvalidAmount`,
//!   `InsufficientFunds`, `RecipientNotFound`, `ExceedsPerTransferCap`,
//!   `ExceedsDailyCap`).
//! - **Atomicity failures**: the storage layer failed and the atomic unit
//!   rolled back; no partial balance change is observable (`TransferFailed`).
//! - **Lookup failures**: surfaced, not retried (`AccountNotFound`,
//!   `UserNotFound`).
//! - **Internal**: `ZeroWindowAccrual` makes the accrual scheduler skip a
//!   tick; it is logged and never surfaced to an end user.

use crate::types::account::AccountKind;
use crate::types::transaction::{AccountId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the banking ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// Transfer amount is zero or negative
    ///
    /// Recoverable - the caller re-prompts for a positive amount.
    #[error("Transfer amount must be greater than zero, got {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// The transfer would push the balance below the overdraft ceiling
    ///
    /// Recoverable - the transfer is rejected and the balance is unchanged.
    #[error("Insufficient funds for account {account}: balance {balance}, requested {requested}, overdraft limit {limit}")]
    InsufficientFunds {
        /// The sending account
        account: AccountId,
        /// Its current balance
        balance: Decimal,
        /// The requested transfer amount
        requested: Decimal,
        /// The effective overdraft limit in force
        limit: Decimal,
    },

    /// The destination account does not exist
    ///
    /// Recoverable - the caller re-prompts for a valid recipient.
    #[error("Recipient account {account} does not exist")]
    RecipientNotFound {
        /// The missing destination account id
        account: AccountId,
    },

    /// A child-saving transfer exceeds the fixed per-transfer cap
    #[error("Amount {amount} exceeds the per-transfer cap of {cap}")]
    ExceedsPerTransferCap {
        /// The rejected amount
        amount: Decimal,
        /// The nominal per-transfer cap
        cap: Decimal,
    },

    /// A child-saving transfer would exceed the rolling daily cap
    ///
    /// Recoverable - the cumulative spend counter is left unchanged.
    #[error("Daily spending cap reached: only {remaining} left in this period, requested {amount}")]
    ExceedsDailyCap {
        /// The rejected amount
        amount: Decimal,
        /// What may still be spent in the current period
        remaining: Decimal,
    },

    /// The storage layer failed while executing the atomic unit
    ///
    /// The unit rolled back; the caller's funds are guaranteed unchanged.
    /// Recoverable by retry.
    #[error("Transfer failed: {reason}")]
    TransferFailed {
        /// Description of the underlying atomicity failure
        reason: String,
    },

    /// Account lookup failed
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The missing account id
        account: AccountId,
    },

    /// User lookup failed
    #[error("User {user} not found")]
    UserNotFound {
        /// The missing user id
        user: UserId,
    },

    /// A user with this id is already registered
    #[error("User {user} already exists")]
    UserAlreadyExists {
        /// The conflicting user id
        user: UserId,
    },

    /// An account with a non-zero balance cannot be closed
    #[error("Account {account} still holds {balance}; transfer all funds before closing")]
    BalanceNotZero {
        /// The account being closed
        account: AccountId,
        /// Its current balance
        balance: Decimal,
    },

    /// The user may not open an account of this kind
    #[error("User {user} may not open a {kind} account")]
    AccountKindNotAllowed {
        /// The requesting user
        user: UserId,
        /// The rejected account kind
        kind: AccountKind,
    },

    /// The acting user lacks the capability for a maintenance operation
    #[error("User {user} is not permitted to {action}")]
    PermissionDenied {
        /// The acting user
        user: UserId,
        /// The operation that was denied
        action: String,
    },

    /// The accrual window has zero elapsed time
    ///
    /// Internal - the scheduler skips the tick and logs; never surfaced to
    /// an end user.
    #[error("Accrual window for account {account} has zero elapsed time")]
    ZeroWindowAccrual {
        /// The account whose tick was skipped
        account: AccountId,
    },

    /// A storage operation outside the transfer path failed
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },
}

// Helper functions for creating common errors

impl BankError {
    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        BankError::InvalidAmount { amount }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
        limit: Decimal,
    ) -> Self {
        BankError::InsufficientFunds {
            account,
            balance,
            requested,
            limit,
        }
    }

    /// Create a RecipientNotFound error
    pub fn recipient_not_found(account: AccountId) -> Self {
        BankError::RecipientNotFound { account }
    }

    /// Create an ExceedsPerTransferCap error
    pub fn exceeds_per_transfer_cap(amount: Decimal, cap: Decimal) -> Self {
        BankError::ExceedsPerTransferCap { amount, cap }
    }

    /// Create an ExceedsDailyCap error
    pub fn exceeds_daily_cap(amount: Decimal, remaining: Decimal) -> Self {
        BankError::ExceedsDailyCap { amount, remaining }
    }

    /// Create a TransferFailed error
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        BankError::TransferFailed {
            reason: reason.into(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: AccountId) -> Self {
        BankError::AccountNotFound { account }
    }

    /// Create a UserNotFound error
    pub fn user_not_found(user: UserId) -> Self {
        BankError::UserNotFound { user }
    }

    /// Create a UserAlreadyExists error
    pub fn user_already_exists(user: UserId) -> Self {
        BankError::UserAlreadyExists { user }
    }

    /// Create a BalanceNotZero error
    pub fn balance_not_zero(account: AccountId, balance: Decimal) -> Self {
        BankError::BalanceNotZero { account, balance }
    }

    /// Create an AccountKindNotAllowed error
    pub fn account_kind_not_allowed(user: UserId, kind: AccountKind) -> Self {
        BankError::AccountKindNotAllowed { user, kind }
    }

    /// Create a PermissionDenied error
    pub fn permission_denied(user: UserId, action: &str) -> Self {
        BankError::PermissionDenied {
            user,
            action: action.to_string(),
        }
    }

    /// Create a ZeroWindowAccrual error
    pub fn zero_window(account: AccountId) -> Self {
        BankError::ZeroWindowAccrual { account }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        BankError::Storage {
            message: message.into(),
        }
    }

    /// Whether this error is a transfer validation error resolved at the
    /// policy boundary, before any balance is touched
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BankError::InvalidAmount { .. }
                | BankError::InsufficientFunds { .. }
                | BankError::RecipientNotFound { .. }
                | BankError::ExceedsPerTransferCap { .. }
                | BankError::ExceedsDailyCap { .. }
        )
    }
}

// Conversion from io::Error to BankError
impl From<std::io::Error> for BankError {
    fn from(error: std::io::Error) -> Self {
        BankError::storage(error.to_string())
    }
}

// Conversion from sled::Error to BankError
impl From<sled::Error> for BankError {
    fn from(error: sled::Error) -> Self {
        BankError::storage(error.to_string())
    }
}

// Conversion from serde_json::Error to BankError
impl From<serde_json::Error> for BankError {
    fn from(error: serde_json::Error) -> Self {
        BankError::storage(error.to_string())
    }
}
