//! Balance history tracking for interest accrual
//!
//! Each interest-bearing account keeps an in-memory, append-only log of
//! `(timestamp, balance)` samples: a seed sample when the account is opened
//! or loaded, one sample after every committed mutation, and a fresh seed
//! after each accrual tick. The time-weighted average over the window drives
//! the interest computation.
//!
//! The log is deliberately not durable. Losing it on restart shortens the
//! current accrual window but cannot corrupt the ledger.

use crate::types::{AccountId, BankError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// One account's accrual window
struct AccountHistory {
    /// Start of the window: account load time, or the last reset
    window_start: DateTime<Utc>,
    /// Ordered samples; never empty, the first one is the seed
    samples: Vec<(DateTime<Utc>, Decimal)>,
}

/// Per-account balance sample log
pub struct BalanceHistory {
    histories: DashMap<AccountId, AccountHistory>,
}

impl BalanceHistory {
    /// Create an empty tracker
    pub fn new() -> Self {
        BalanceHistory {
            histories: DashMap::new(),
        }
    }

    /// Start (or restart) an account's window with a single seed sample
    ///
    /// Used when an account is opened or loaded, and after every accrual
    /// tick.
    pub fn seed(&self, account: AccountId, at: DateTime<Utc>, balance: Decimal) {
        self.histories.insert(
            account,
            AccountHistory {
                window_start: at,
                samples: vec![(at, balance)],
            },
        );
    }

    /// Append a sample after a committed mutation
    ///
    /// Untracked accounts are ignored (only interest-bearing variants are
    /// seeded). A sample whose timestamp does not advance past the last one
    /// is dropped: the earlier sample defines the balance for the interval
    /// it opens.
    pub fn record(&self, account: AccountId, at: DateTime<Utc>, balance: Decimal) {
        if let Some(mut entry) = self.histories.get_mut(&account) {
            let advances = match entry.samples.last() {
                Some(&(last, _)) => at > last,
                None => true,
            };
            if advances {
                entry.samples.push((at, balance));
            }
        }
    }

    /// Whether an account is being tracked
    pub fn is_tracked(&self, account: AccountId) -> bool {
        self.histories.contains_key(&account)
    }

    /// Stop tracking an account (account close)
    pub fn remove(&self, account: AccountId) {
        self.histories.remove(&account);
    }

    /// The time-weighted average balance over the current window
    ///
    /// Each sample's balance is weighted by the seconds until the next
    /// sample; the final sample extends to `now`. The weighted sum is
    /// divided by the seconds elapsed since the window start.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for untracked accounts and
    /// `ZeroWindowAccrual` when no time has elapsed since the window start,
    /// in which case the caller must skip accrual for this tick.
    pub fn time_weighted_average(
        &self,
        account: AccountId,
        now: DateTime<Utc>,
    ) -> Result<Decimal, BankError> {
        let entry = self
            .histories
            .get(&account)
            .ok_or_else(|| BankError::account_not_found(account))?;

        let window = seconds_between(entry.window_start, now);
        if window <= Decimal::ZERO {
            return Err(BankError::zero_window(account));
        }

        let mut weighted = Decimal::ZERO;
        for pair in entry.samples.windows(2) {
            let (start, balance) = pair[0];
            let (end, _) = pair[1];
            weighted += balance * seconds_between(start, end);
        }
        if let Some(&(last, balance)) = entry.samples.last() {
            let tail = seconds_between(last, now);
            if tail > Decimal::ZERO {
                weighted += balance * tail;
            }
        }

        Ok(weighted / window)
    }
}

impl Default for BalanceHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Elapsed seconds from `start` to `end`, at millisecond precision
fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    Decimal::new((end - start).num_milliseconds(), 3)
}
