//! Per-variant account policy
//!
//! The behavioral differences between account variants live here as a policy
//! table keyed by [`AccountKind`]: overdraft ceilings, interest rules and the
//! child transfer caps. Transfer validation runs entirely at this boundary,
//! so validation errors never reach the store.
//!
//! # Child caps
//!
//! ChildSaving transfers are checked against two nominal constants before the
//! base checks: a hard per-transfer cap and a rolling daily cumulative cap,
//! both 200. The cumulative spend is tracked in memory by [`CapTracker`] and
//! zeroed by the scheduler once per simulated day. Interest postings bypass
//! this module entirely and are never charged against the caps.

use crate::config::BankConfig;
use crate::types::{Account, AccountId, AccountKind, BankError};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// The hard per-transfer and daily cumulative cap for child-saving accounts
///
/// A nominal constant, independent of any explicit per-account spending
/// limit.
pub fn child_transfer_cap() -> Decimal {
    Decimal::new(200, 0)
}

/// The spending limit recorded on newly opened child-saving accounts
pub fn child_default_spending_limit() -> Decimal {
    Decimal::new(200, 0)
}

/// The fixed opening bonus credited to every new account
pub fn opening_balance() -> Decimal {
    Decimal::new(1000, 0)
}

/// The monthly interest accrued for a variant given its time-weighted
/// average balance
///
/// - Debit accounts never accrue.
/// - Credit accounts are charged `average * rate / 12`, and only while the
///   average is negative; the result is a negative delta.
/// - Saving and ChildSaving accounts earn `average * rate / 12`.
///
/// The result is rounded to four decimal places.
pub fn monthly_interest(kind: AccountKind, average: Decimal, config: &BankConfig) -> Decimal {
    let months_per_year = Decimal::from(12);
    let accrued = match kind {
        AccountKind::Debit => Decimal::ZERO,
        AccountKind::Credit => {
            if average < Decimal::ZERO {
                average * config.credit_interest_rate / months_per_year
            } else {
                Decimal::ZERO
            }
        }
        AccountKind::Saving | AccountKind::ChildSaving => {
            average * config.savings_interest_rate / months_per_year
        }
    };
    accrued.round_dp(4)
}

/// Validate a transfer against the sending account's policy
///
/// Runs the per-variant rule set against the current persisted balance:
/// child caps first, then the amount, overdraft and recipient checks.
///
/// # Arguments
///
/// * `account` - The sending account, freshly re-read from the store
/// * `amount` - The requested transfer amount
/// * `to` - The destination account id
/// * `recipient_exists` - Whether the destination exists in the store
/// * `caps` - The child daily-spend tracker
/// * `config` - The active configuration
///
/// # Errors
///
/// Returns the first failing check: `ExceedsPerTransferCap`,
/// `ExceedsDailyCap`, `InvalidAmount`, `InsufficientFunds` or
/// `RecipientNotFound`.
pub fn validate_transfer(
    account: &Account,
    amount: Decimal,
    to: AccountId,
    recipient_exists: bool,
    caps: &CapTracker,
    config: &BankConfig,
) -> Result<(), BankError> {
    // Child cap checks run before the base checks
    if account.kind == AccountKind::ChildSaving {
        let cap = child_transfer_cap();
        if amount > cap {
            return Err(BankError::exceeds_per_transfer_cap(amount, cap));
        }
        let spent = caps.spent(account.id);
        if spent + amount > cap {
            return Err(BankError::exceeds_daily_cap(amount, cap - spent));
        }
    }

    if amount <= Decimal::ZERO {
        return Err(BankError::invalid_amount(amount));
    }

    let limit = account.effective_limit(config);
    if account.balance - amount < -limit {
        return Err(BankError::insufficient_funds(
            account.id,
            account.balance,
            amount,
            limit,
        ));
    }

    if !recipient_exists {
        return Err(BankError::recipient_not_found(to));
    }

    Ok(())
}

/// Rolling daily-spend counters for child-saving accounts
///
/// One counter per account, accumulated on every committed outgoing transfer
/// and zeroed by the scheduler every simulated day. The counters are
/// memory-only; losing them on restart resets the current period early but
/// never corrupts the ledger.
pub struct CapTracker {
    spent: DashMap<AccountId, Decimal>,
}

impl CapTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        CapTracker {
            spent: DashMap::new(),
        }
    }

    /// The cumulative spend of an account in the current period
    ///
    /// Untracked accounts report zero.
    pub fn spent(&self, account: AccountId) -> Decimal {
        self.spent
            .get(&account)
            .map(|entry| *entry.value())
            .unwrap_or(Decimal::ZERO)
    }

    /// Add a committed transfer to an account's cumulative spend
    pub fn record_spend(&self, account: AccountId, amount: Decimal) {
        *self.spent.entry(account).or_insert(Decimal::ZERO) += amount;
    }

    /// Zero every counter (the daily reset)
    pub fn reset_all(&self) {
        for mut entry in self.spent.iter_mut() {
            *entry.value_mut() = Decimal::ZERO;
        }
    }

    /// Drop an account's counter entirely (account close)
    pub fn remove(&self, account: AccountId) {
        self.spent.remove(&account);
    }
}

impl Default for CapTracker {
    fn default() -> Self {
        Self::new()
    }
}
