//! Transfer engine
//!
//! Every balance mutation in the system funnels through this module: user
//! transfers, interest postings and account closes. The engine owns the
//! exclusion boundary mandated by the concurrency design - a single mutation
//! lock held around each atomic unit - because the stores do not provide
//! multi-statement isolation across separate calls on their own.
//!
//! Inside the boundary the engine re-reads the persisted balance (never
//! trusting a caller's stale copy), validates at the policy boundary,
//! executes the store's atomic unit, and then refreshes balances from the
//! store to feed the balance history and the child spend counters.

use crate::clock::Clock;
use crate::config::ConfigProvider;
use crate::core::history::BalanceHistory;
use crate::core::policy::{self, CapTracker};
use crate::store::LedgerStore;
use crate::types::{AccountId, AccountKind, BankError, TransactionRecord};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Executes balance mutations as serialized atomic units
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
    history: Arc<BalanceHistory>,
    caps: Arc<CapTracker>,
    config: Arc<ConfigProvider>,
    clock: Arc<dyn Clock>,

    /// The exclusion boundary around every balance mutation
    ///
    /// Foreground transfers and background accrual postings race for this
    /// lock; whichever wins commits first and the loser observes the updated
    /// balance on its own re-read.
    mutation_lock: Mutex<()>,
}

impl TransferEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        store: Arc<dyn LedgerStore>,
        history: Arc<BalanceHistory>,
        caps: Arc<CapTracker>,
        config: Arc<ConfigProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        TransferEngine {
            store,
            history,
            caps,
            config,
            clock,
            mutation_lock: Mutex::new(()),
        }
    }

    /// Execute a validated transfer between two accounts
    ///
    /// Under the mutation lock: re-reads the sender's persisted balance,
    /// validates against the account policy, executes the store's atomic
    /// debit-credit-record unit, then refreshes both balances from the store
    /// (not by local arithmetic) to record history samples and the child
    /// spend.
    ///
    /// # Errors
    ///
    /// Validation errors (`InvalidAmount`, `InsufficientFunds`,
    /// `RecipientNotFound`, `ExceedsPerTransferCap`, `ExceedsDailyCap`) are
    /// returned before the store is touched. `TransferFailed` signals a
    /// storage failure with the atomic unit rolled back; the sender's funds
    /// are guaranteed unchanged.
    pub fn execute_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransactionRecord, BankError> {
        let _guard = self
            .mutation_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let config = self.config.current();

        // Re-read the current persisted balance under the same exclusion
        // scope used for the update
        let account = self
            .store
            .account(from)?
            .ok_or_else(|| BankError::account_not_found(from))?;
        let recipient_exists = self.store.account_exists(to)?;

        policy::validate_transfer(&account, amount, to, recipient_exists, &self.caps, &config)?;

        let record = self
            .store
            .atomic_transfer(from, to, amount, self.clock.now())?;

        if account.kind == AccountKind::ChildSaving {
            self.caps.record_spend(from, amount);
        }
        self.sample_balance(from, record.timestamp)?;
        self.sample_balance(to, record.timestamp)?;

        Ok(record)
    }

    /// Apply an interest accrual to an account
    ///
    /// The restricted internal path: a self-referential posting that skips
    /// the recipient and cap checks (the account is its own recipient) but
    /// still executes atomically. On commit the accrual window is cleared
    /// and reseeded at `(at, balance)`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account was closed since the tick
    /// started, and `TransferFailed` for storage failures.
    pub fn post_interest(
        &self,
        account: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError> {
        let _guard = self
            .mutation_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.store.account_exists(account)? {
            return Err(BankError::account_not_found(account));
        }

        let record = self.store.atomic_self_credit(account, delta, at)?;
        let balance = self.store.balance(account)?;
        self.history.seed(account, at, balance);

        Ok(record)
    }

    /// Restart an account's accrual window without posting
    ///
    /// Used for ticks whose accrued interest is zero: the window still
    /// resets to `(at, current balance)`.
    pub fn resync_window(&self, account: AccountId, at: DateTime<Utc>) -> Result<(), BankError> {
        let _guard = self
            .mutation_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let balance = self.store.balance(account)?;
        self.history.seed(account, at, balance);
        Ok(())
    }

    /// Close an account with a zero balance
    ///
    /// Under the mutation lock the account row and its transactions are
    /// deleted and the account is dropped from the history and cap trackers,
    /// so no further accrual tick can post against it. A tick already racing
    /// this close observes `AccountNotFound` and skips.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist and
    /// `BalanceNotZero` unless the balance is exactly zero.
    pub fn close_account(&self, account: AccountId) -> Result<(), BankError> {
        let _guard = self
            .mutation_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        self.store.delete_account(account)?;
        self.history.remove(account);
        self.caps.remove(account);
        debug!(account, "account closed");
        Ok(())
    }

    /// Record a post-commit balance sample for an account
    ///
    /// The balance is re-read from the store rather than derived locally, so
    /// the sample cannot drift from concurrent accrual postings.
    fn sample_balance(&self, account: AccountId, at: DateTime<Utc>) -> Result<(), BankError> {
        let balance = self.store.balance(account)?;
        self.history.record(account, at, balance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::BankConfig;
    use crate::store::MemoryLedger;
    use crate::types::{User, UserRole};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    struct Fixture {
        engine: TransferEngine,
        store: Arc<MemoryLedger>,
        history: Arc<BalanceHistory>,
        caps: Arc<CapTracker>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryLedger::new());
        let history = Arc::new(BalanceHistory::new());
        let caps = Arc::new(CapTracker::new());
        let config = Arc::new(ConfigProvider::fixed(BankConfig::default()));
        let clock = Arc::new(ManualClock::new(t0()));

        store
            .insert_user(User {
                id: 1,
                role: UserRole::Client,
                name: "Test".to_string(),
                is_child: false,
            })
            .unwrap();

        let engine = TransferEngine::new(
            store.clone(),
            history.clone(),
            caps.clone(),
            config,
            clock.clone(),
        );
        Fixture {
            engine,
            store,
            history,
            caps,
            clock,
        }
    }

    fn open(f: &Fixture, kind: AccountKind, balance: Decimal) -> AccountId {
        let account = f
            .store
            .insert_account(1, kind, balance, None, f.clock.now())
            .unwrap();
        if kind.bears_interest() {
            f.history.seed(account.id, f.clock.now(), balance);
        }
        account.id
    }

    #[test]
    fn test_execute_transfer_moves_funds_and_records_samples() {
        let f = fixture();
        let from = open(&f, AccountKind::Saving, dec(1000));
        let to = open(&f, AccountKind::Saving, dec(1000));

        f.clock.advance(chrono::Duration::seconds(10));
        let record = f.engine.execute_transfer(from, to, dec(300)).unwrap();

        assert_eq!(record.amount, dec(300));
        assert_eq!(f.store.balance(from).unwrap(), dec(700));
        assert_eq!(f.store.balance(to).unwrap(), dec(1300));

        // The samples reflect the post-commit balances: 1000 for 10s, then
        // 700 for 10s
        f.clock.advance(chrono::Duration::seconds(10));
        let average = f
            .history
            .time_weighted_average(from, f.clock.now())
            .unwrap();
        assert_eq!(average, dec(850));
    }

    #[test]
    fn test_execute_transfer_uses_persisted_balance_not_caller_state() {
        let f = fixture();
        let from = open(&f, AccountKind::Debit, dec(1000));
        let to = open(&f, AccountKind::Debit, dec(0));

        // Drain the account behind the caller's back
        f.engine.execute_transfer(from, to, dec(950)).unwrap();

        // The re-read balance of 50 rejects a 100 transfer even though the
        // account started with 1000
        let result = f.engine.execute_transfer(from, to, dec(100));
        assert_eq!(
            result,
            Err(BankError::insufficient_funds(from, dec(50), dec(100), dec(0)))
        );
    }

    #[test]
    fn test_execute_transfer_rejects_missing_sender() {
        let f = fixture();
        let to = open(&f, AccountKind::Debit, dec(0));

        let result = f.engine.execute_transfer(999, to, dec(10));
        assert_eq!(result, Err(BankError::account_not_found(999)));
    }

    #[test]
    fn test_execute_transfer_validation_never_reaches_store() {
        let f = fixture();
        let from = open(&f, AccountKind::Debit, dec(1000));

        let result = f.engine.execute_transfer(from, 42, dec(10));
        assert_eq!(result, Err(BankError::recipient_not_found(42)));

        // No record was written and the balance is untouched
        assert_eq!(f.store.balance(from).unwrap(), dec(1000));
        assert!(f.store.history(from).unwrap().is_empty());
    }

    #[test]
    fn test_execute_transfer_tracks_child_spend() {
        let f = fixture();
        let from = open(&f, AccountKind::ChildSaving, dec(1000));
        let to = open(&f, AccountKind::Debit, dec(0));

        f.engine.execute_transfer(from, to, dec(120)).unwrap();
        assert_eq!(f.caps.spent(from), dec(120));

        // A rejected transfer leaves the counter unchanged
        let result = f.engine.execute_transfer(from, to, dec(100));
        assert_eq!(
            result,
            Err(BankError::exceeds_daily_cap(dec(100), dec(80)))
        );
        assert_eq!(f.caps.spent(from), dec(120));
    }

    #[test]
    fn test_post_interest_applies_delta_and_reseeds_window() {
        let f = fixture();
        let account = open(&f, AccountKind::Saving, dec(1000));

        f.clock.advance(chrono::Duration::seconds(30));
        let now = f.clock.now();
        let record = f.engine.post_interest(account, Decimal::new(25, 1), now).unwrap();

        assert!(record.is_interest_posting());
        assert_eq!(f.store.balance(account).unwrap(), Decimal::new(10025, 1));

        // The window restarted at the posting: a later average sees only the
        // new balance
        f.clock.advance(chrono::Duration::seconds(10));
        let average = f
            .history
            .time_weighted_average(account, f.clock.now())
            .unwrap();
        assert_eq!(average, Decimal::new(10025, 1));
    }

    #[test]
    fn test_post_interest_skips_caps() {
        let f = fixture();
        let account = open(&f, AccountKind::ChildSaving, dec(1000));

        f.clock.advance(chrono::Duration::seconds(30));
        f.engine
            .post_interest(account, Decimal::new(25, 1), f.clock.now())
            .unwrap();

        // Interest is never charged against the daily spend
        assert_eq!(f.caps.spent(account), Decimal::ZERO);
    }

    #[test]
    fn test_post_interest_on_closed_account() {
        let f = fixture();
        let result = f.engine.post_interest(77, dec(1), t0());
        assert_eq!(result, Err(BankError::account_not_found(77)));
    }

    #[test]
    fn test_close_account_requires_zero_balance() {
        let f = fixture();
        let account = open(&f, AccountKind::Saving, dec(50));

        let result = f.engine.close_account(account);
        assert_eq!(result, Err(BankError::balance_not_zero(account, dec(50))));
        assert!(f.history.is_tracked(account));
    }

    #[test]
    fn test_close_account_stops_tracking() {
        let f = fixture();
        let account = open(&f, AccountKind::Saving, dec(0));

        f.engine.close_account(account).unwrap();

        assert!(!f.store.account_exists(account).unwrap());
        assert!(!f.history.is_tracked(account));
        // A tick racing the close now observes AccountNotFound
        let result = f.engine.post_interest(account, dec(1), f.clock.now());
        assert_eq!(result, Err(BankError::account_not_found(account)));
    }

    #[test]
    fn test_concurrent_transfers_serialize_without_lost_updates() {
        use std::thread;

        let f = fixture();
        let from = open(&f, AccountKind::Debit, dec(1000));
        let to = open(&f, AccountKind::Debit, dec(0));

        let engine = Arc::new(f.engine);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = engine.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    engine.execute_transfer(from, to, dec(1)).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(f.store.balance(from).unwrap(), dec(900));
        assert_eq!(f.store.balance(to).unwrap(), dec(100));
        assert_eq!(f.store.history(from).unwrap().len(), 100);
    }
}
