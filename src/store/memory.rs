//! In-memory ledger store
//!
//! Keeps the whole ledger in a single mutex-guarded state block. The mutex
//! makes each store call atomic on its own, which is exactly the contract
//! the trait asks for; cross-call serialization is still the transfer
//! engine's job.
//!
//! This implementation backs the test suites and the `--memory` mode of the
//! console front end.

use crate::store::LedgerStore;
use crate::types::{
    Account, AccountId, AccountKind, BankError, TransactionId, TransactionRecord, User, UserId,
    UserRole,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

/// Mutable ledger state behind the mutex
struct LedgerState {
    users: HashMap<UserId, User>,
    accounts: BTreeMap<AccountId, Account>,
    transactions: BTreeMap<TransactionId, TransactionRecord>,
    next_account_id: AccountId,
    next_transaction_id: TransactionId,
}

/// In-memory implementation of [`LedgerStore`]
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        MemoryLedger {
            state: Mutex::new(LedgerState {
                users: HashMap::new(),
                accounts: BTreeMap::new(),
                transactions: BTreeMap::new(),
                next_account_id: 1,
                next_transaction_id: 1,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryLedger {
    fn insert_user(&self, user: User) -> Result<(), BankError> {
        let mut state = self.lock();
        if state.users.contains_key(&user.id) {
            return Err(BankError::user_already_exists(user.id));
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, BankError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    fn set_user_role(&self, id: UserId, role: UserRole) -> Result<(), BankError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| BankError::user_not_found(id))?;
        user.role = role;
        Ok(())
    }

    fn set_user_child_flag(&self, id: UserId, is_child: bool) -> Result<(), BankError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| BankError::user_not_found(id))?;
        user.is_child = is_child;
        Ok(())
    }

    fn set_user_name(&self, id: UserId, name: String) -> Result<(), BankError> {
        let mut state = self.lock();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| BankError::user_not_found(id))?;
        user.name = name;
        Ok(())
    }

    fn insert_account(
        &self,
        user: UserId,
        kind: AccountKind,
        opening_balance: Decimal,
        spending_limit: Option<Decimal>,
        opened_at: DateTime<Utc>,
    ) -> Result<Account, BankError> {
        let mut state = self.lock();
        if !state.users.contains_key(&user) {
            return Err(BankError::user_not_found(user));
        }

        let id = state.next_account_id;
        state.next_account_id += 1;

        let account = Account {
            id,
            user,
            kind,
            balance: opening_balance,
            spending_limit,
            opened_at,
        };
        state.accounts.insert(id, account.clone());
        Ok(account)
    }

    fn account(&self, id: AccountId) -> Result<Option<Account>, BankError> {
        Ok(self.lock().accounts.get(&id).cloned())
    }

    fn account_exists(&self, id: AccountId) -> Result<bool, BankError> {
        Ok(self.lock().accounts.contains_key(&id))
    }

    fn balance(&self, id: AccountId) -> Result<Decimal, BankError> {
        self.lock()
            .accounts
            .get(&id)
            .map(|account| account.balance)
            .ok_or_else(|| BankError::account_not_found(id))
    }

    fn accounts_for_user(&self, user: UserId) -> Result<Vec<Account>, BankError> {
        Ok(self
            .lock()
            .accounts
            .values()
            .filter(|account| account.user == user)
            .cloned()
            .collect())
    }

    fn interest_bearing_accounts(&self) -> Result<Vec<Account>, BankError> {
        Ok(self
            .lock()
            .accounts
            .values()
            .filter(|account| account.kind.bears_interest())
            .cloned()
            .collect())
    }

    fn set_spending_limit(
        &self,
        id: AccountId,
        limit: Option<Decimal>,
    ) -> Result<(), BankError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| BankError::account_not_found(id))?;
        account.spending_limit = limit;
        Ok(())
    }

    fn delete_account(&self, id: AccountId) -> Result<(), BankError> {
        let mut state = self.lock();
        let account = state
            .accounts
            .get(&id)
            .ok_or_else(|| BankError::account_not_found(id))?;
        if account.balance != Decimal::ZERO {
            return Err(BankError::balance_not_zero(id, account.balance));
        }

        state.accounts.remove(&id);
        state
            .transactions
            .retain(|_, record| record.from != id && record.to != id);
        Ok(())
    }

    fn atomic_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError> {
        let mut state = self.lock();

        // All checks run before any mutation, so the unit is all-or-nothing
        if !state.accounts.contains_key(&from) {
            return Err(BankError::account_not_found(from));
        }
        if !state.accounts.contains_key(&to) {
            return Err(BankError::recipient_not_found(to));
        }
        if amount <= Decimal::ZERO {
            return Err(BankError::invalid_amount(amount));
        }

        if let Some(sender) = state.accounts.get_mut(&from) {
            sender.balance -= amount;
        }
        if let Some(recipient) = state.accounts.get_mut(&to) {
            recipient.balance += amount;
        }

        let id = state.next_transaction_id;
        state.next_transaction_id += 1;
        let record = TransactionRecord {
            id,
            from,
            to,
            amount,
            timestamp: at,
        };
        state.transactions.insert(id, record.clone());
        Ok(record)
    }

    fn atomic_self_credit(
        &self,
        account: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError> {
        let mut state = self.lock();

        let entry = state
            .accounts
            .get_mut(&account)
            .ok_or_else(|| BankError::account_not_found(account))?;
        entry.balance += delta;

        let id = state.next_transaction_id;
        state.next_transaction_id += 1;
        let record = TransactionRecord {
            id,
            from: account,
            to: account,
            amount: delta,
            timestamp: at,
        };
        state.transactions.insert(id, record.clone());
        Ok(record)
    }

    fn history(&self, account: AccountId) -> Result<Vec<TransactionRecord>, BankError> {
        let state = self.lock();
        if !state.accounts.contains_key(&account) {
            return Err(BankError::account_not_found(account));
        }

        let mut records: Vec<TransactionRecord> = state
            .transactions
            .values()
            .filter(|record| record.from == account || record.to == account)
            .cloned()
            .collect();
        records.sort_by_key(|record| (record.timestamp, record.id));
        Ok(records)
    }
}
