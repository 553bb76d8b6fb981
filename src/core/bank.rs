//! Bank facade
//!
//! `Bank` wires the ledger store, configuration, clock, transfer engine,
//! balance history and cap tracker together and exposes the operations the
//! outer layers consume: registration, account opening and closing,
//! transfers, history reads, capability-checked maintenance, and the two
//! entry points the accrual scheduler drives.

use crate::clock::Clock;
use crate::config::{BankConfig, ConfigProvider};
use crate::core::engine::TransferEngine;
use crate::core::history::BalanceHistory;
use crate::core::policy::{self, CapTracker};
use crate::store::LedgerStore;
use crate::types::{
    Account, AccountId, AccountKind, BankError, TransactionRecord, User, UserId, UserRole,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The core banking service
pub struct Bank {
    store: Arc<dyn LedgerStore>,
    config: Arc<ConfigProvider>,
    clock: Arc<dyn Clock>,
    history: Arc<BalanceHistory>,
    caps: Arc<CapTracker>,
    engine: TransferEngine,
}

impl Bank {
    /// Assemble the bank over a store, configuration and clock
    ///
    /// Seeds the accrual window of every interest-bearing account already in
    /// the store, so a freshly loaded ledger starts accruing from load time.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        config: Arc<ConfigProvider>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BankError> {
        let history = Arc::new(BalanceHistory::new());
        let caps = Arc::new(CapTracker::new());
        let engine = TransferEngine::new(
            store.clone(),
            history.clone(),
            caps.clone(),
            config.clone(),
            clock.clone(),
        );

        let now = clock.now();
        for account in store.interest_bearing_accounts()? {
            history.seed(account.id, now, account.balance);
        }

        Ok(Bank {
            store,
            config,
            clock,
            history,
            caps,
            engine,
        })
    }

    /// The active configuration snapshot
    pub fn config(&self) -> Arc<BankConfig> {
        self.config.current()
    }

    /// Re-read the configuration from its backing file
    pub fn reload_config(&self) {
        self.config.reload();
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// Returns `UserAlreadyExists` if the id is taken.
    pub fn register_user(
        &self,
        id: UserId,
        name: impl Into<String>,
        role: UserRole,
        is_child: bool,
    ) -> Result<User, BankError> {
        let user = User {
            id,
            role,
            name: name.into(),
            is_child,
        };
        self.store.insert_user(user.clone())?;
        info!(user = id, %role, "user registered");
        Ok(user)
    }

    /// Look up a user
    pub fn user(&self, id: UserId) -> Result<User, BankError> {
        self.store
            .user(id)?
            .ok_or_else(|| BankError::user_not_found(id))
    }

    /// Open an account for a user
    ///
    /// The account starts with the fixed opening bonus. Child users may only
    /// open Debit and ChildSaving accounts; opening a ChildSaving account
    /// without an explicit limit records the default child limit. Interest-
    /// bearing accounts are seeded into the balance history so accrual
    /// starts at opening time.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist and
    /// `AccountKindNotAllowed` if a child user requests a restricted kind.
    pub fn open_account(
        &self,
        user_id: UserId,
        kind: AccountKind,
        explicit_limit: Option<Decimal>,
    ) -> Result<Account, BankError> {
        let user = self.user(user_id)?;
        if user.is_child && !kind.allowed_for_child() {
            return Err(BankError::account_kind_not_allowed(user_id, kind));
        }

        let spending_limit = explicit_limit.or_else(|| match kind {
            AccountKind::ChildSaving => Some(policy::child_default_spending_limit()),
            _ => None,
        });

        let now = self.clock.now();
        let account = self.store.insert_account(
            user_id,
            kind,
            policy::opening_balance(),
            spending_limit,
            now,
        )?;

        if kind.bears_interest() {
            self.history.seed(account.id, now, account.balance);
        }

        info!(account = account.id, user = user_id, %kind, "account opened");
        Ok(account)
    }

    /// Look up an account
    pub fn account(&self, id: AccountId) -> Result<Account, BankError> {
        self.store
            .account(id)?
            .ok_or_else(|| BankError::account_not_found(id))
    }

    /// The current persisted balance of an account
    pub fn balance(&self, id: AccountId) -> Result<Decimal, BankError> {
        self.store.balance(id)
    }

    /// All accounts owned by a user
    pub fn accounts_for_user(&self, user: UserId) -> Result<Vec<Account>, BankError> {
        self.store.accounts_for_user(user)
    }

    /// Transfer funds between two accounts
    ///
    /// Validation, atomicity and refresh semantics are those of
    /// [`TransferEngine::execute_transfer`].
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransactionRecord, BankError> {
        let record = self.engine.execute_transfer(from, to, amount)?;
        info!(
            transaction = record.id,
            from, to, amount = %record.amount, "transfer committed"
        );
        Ok(record)
    }

    /// Close an account with a zero balance, deleting its transactions
    pub fn close_account(&self, id: AccountId) -> Result<(), BankError> {
        self.engine.close_account(id)?;
        info!(account = id, "account closed");
        Ok(())
    }

    /// All transactions touching an account, timestamp ascending
    pub fn history(&self, id: AccountId) -> Result<Vec<TransactionRecord>, BankError> {
        self.store.history(id)
    }

    /// Set or clear an account's explicit spending limit (Banker/Admin)
    pub fn set_spending_limit(
        &self,
        acting: UserId,
        account: AccountId,
        limit: Option<Decimal>,
    ) -> Result<(), BankError> {
        let actor = self.user(acting)?;
        if !actor.can_modify_limits() {
            return Err(BankError::permission_denied(
                acting,
                "modify spending limits",
            ));
        }
        if !self.store.account_exists(account)? {
            return Err(BankError::account_not_found(account));
        }
        self.store.set_spending_limit(account, limit)?;
        info!(account, acting, "spending limit updated");
        Ok(())
    }

    /// Change a user's child flag (Banker/Admin)
    pub fn set_child_flag(
        &self,
        acting: UserId,
        user: UserId,
        is_child: bool,
    ) -> Result<(), BankError> {
        let actor = self.user(acting)?;
        if !actor.can_modify_child_flag() {
            return Err(BankError::permission_denied(acting, "modify child status"));
        }
        self.store.set_user_child_flag(user, is_child)?;
        info!(user, acting, is_child, "child status updated");
        Ok(())
    }

    /// Change a user's role (Admin)
    pub fn set_role(&self, acting: UserId, user: UserId, role: UserRole) -> Result<(), BankError> {
        let actor = self.user(acting)?;
        if !actor.can_administer() {
            return Err(BankError::permission_denied(acting, "modify roles"));
        }
        self.store.set_user_role(user, role)?;
        info!(user, acting, %role, "role updated");
        Ok(())
    }

    /// Change a user's display name (Admin)
    pub fn rename_user(
        &self,
        acting: UserId,
        user: UserId,
        name: impl Into<String>,
    ) -> Result<(), BankError> {
        let actor = self.user(acting)?;
        if !actor.can_administer() {
            return Err(BankError::permission_denied(acting, "rename users"));
        }
        self.store.set_user_name(user, name.into())?;
        Ok(())
    }

    /// Run one accrual tick over every interest-bearing account
    ///
    /// Driven by the scheduler. Per-account failures are logged and
    /// swallowed: a missed tick is preferable to a crashed background task,
    /// and the balance is never left inconsistent because postings go
    /// through the engine's atomic path.
    pub fn run_accrual_tick(&self) {
        let now = self.clock.now();
        let accounts = match self.store.interest_bearing_accounts() {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("accrual tick could not list accounts: {}", e);
                return;
            }
        };

        for account in accounts {
            match self.accrue_account(&account) {
                Ok(()) => {}
                Err(BankError::ZeroWindowAccrual { .. }) => {
                    debug!(account = account.id, "zero accrual window, tick skipped");
                }
                Err(e) => {
                    warn!(account = account.id, "accrual skipped: {}", e);
                }
            }
        }
        debug!(at = %now, "accrual tick finished");
    }

    /// Zero the child daily-spend counters (one simulated day elapsed)
    pub fn reset_daily_caps(&self) {
        self.caps.reset_all();
        debug!("daily spending caps reset");
    }

    /// Compute and apply one account's accrual
    fn accrue_account(&self, account: &Account) -> Result<(), BankError> {
        let now = self.clock.now();
        let average = self.history.time_weighted_average(account.id, now)?;

        // A negative average on a non-credit account should be impossible
        // under the balance invariant; discard the window rather than post a
        // negative credit
        if account.kind != AccountKind::Credit && average < Decimal::ZERO {
            warn!(
                account = account.id,
                %average,
                "negative average on a non-overdraft account, window discarded"
            );
            return self.engine.resync_window(account.id, now);
        }

        let interest = policy::monthly_interest(account.kind, average, &self.config.current());
        if interest.is_zero() {
            return self.engine.resync_window(account.id, now);
        }

        let record = self.engine.post_interest(account.id, interest, now)?;
        info!(
            account = account.id,
            transaction = record.id,
            interest = %interest,
            "interest posted"
        );
        Ok(())
    }
}
