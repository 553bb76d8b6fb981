//! Durable ledger store on sled
//!
//! Users, accounts and transactions live in three sled trees keyed by their
//! big-endian ids, with values encoded as JSON. The two balance-mutating
//! entry points run inside multi-tree sled transactions, so the
//! debit-credit-record triple either commits as a whole or rolls back.
//!
//! Identifiers come from sled's monotonic id generator, so they survive
//! restarts without a separate counter row.

use crate::store::LedgerStore;
use crate::types::{
    Account, AccountId, AccountKind, BankError, TransactionRecord, User, UserId, UserRole,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Transactional, Tree};
use std::path::Path;

const USERS_TREE: &str = "users";
const ACCOUNTS_TREE: &str = "accounts";
const TRANSACTIONS_TREE: &str = "transactions";

/// Sled-backed implementation of [`LedgerStore`]
pub struct SledLedger {
    db: sled::Db,
    users: Tree,
    accounts: Tree,
    transactions: Tree,
}

impl SledLedger {
    /// Open (or create) the ledger database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let db = sled::open(path)?;
        let users = db.open_tree(USERS_TREE)?;
        let accounts = db.open_tree(ACCOUNTS_TREE)?;
        let transactions = db.open_tree(TRANSACTIONS_TREE)?;
        Ok(SledLedger {
            db,
            users,
            accounts,
            transactions,
        })
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, BankError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, BankError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn load_account(&self, id: AccountId) -> Result<Option<Account>, BankError> {
        match self.accounts.get(id.to_be_bytes())? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn scan_accounts(&self) -> Result<Vec<Account>, BankError> {
        let mut accounts = Vec::new();
        for entry in self.accounts.iter() {
            let (_, raw) = entry?;
            accounts.push(Self::decode(&raw)?);
        }
        Ok(accounts)
    }

    fn flush(&self) -> Result<(), BankError> {
        self.db.flush()?;
        Ok(())
    }
}

impl LedgerStore for SledLedger {
    fn insert_user(&self, user: User) -> Result<(), BankError> {
        if self.users.get(user.id.to_be_bytes())?.is_some() {
            return Err(BankError::user_already_exists(user.id));
        }
        self.users
            .insert(user.id.to_be_bytes(), Self::encode(&user)?)?;
        self.flush()
    }

    fn user(&self, id: UserId) -> Result<Option<User>, BankError> {
        match self.users.get(id.to_be_bytes())? {
            Some(raw) => Ok(Some(Self::decode(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_user_role(&self, id: UserId, role: UserRole) -> Result<(), BankError> {
        let raw = self
            .users
            .get(id.to_be_bytes())?
            .ok_or_else(|| BankError::user_not_found(id))?;
        let mut user: User = Self::decode(&raw)?;
        user.role = role;
        self.users.insert(id.to_be_bytes(), Self::encode(&user)?)?;
        self.flush()
    }

    fn set_user_child_flag(&self, id: UserId, is_child: bool) -> Result<(), BankError> {
        let raw = self
            .users
            .get(id.to_be_bytes())?
            .ok_or_else(|| BankError::user_not_found(id))?;
        let mut user: User = Self::decode(&raw)?;
        user.is_child = is_child;
        self.users.insert(id.to_be_bytes(), Self::encode(&user)?)?;
        self.flush()
    }

    fn set_user_name(&self, id: UserId, name: String) -> Result<(), BankError> {
        let raw = self
            .users
            .get(id.to_be_bytes())?
            .ok_or_else(|| BankError::user_not_found(id))?;
        let mut user: User = Self::decode(&raw)?;
        user.name = name;
        self.users.insert(id.to_be_bytes(), Self::encode(&user)?)?;
        self.flush()
    }

    fn insert_account(
        &self,
        user: UserId,
        kind: AccountKind,
        opening_balance: Decimal,
        spending_limit: Option<Decimal>,
        opened_at: DateTime<Utc>,
    ) -> Result<Account, BankError> {
        if self.users.get(user.to_be_bytes())?.is_none() {
            return Err(BankError::user_not_found(user));
        }

        let id = self.db.generate_id()?;
        let account = Account {
            id,
            user,
            kind,
            balance: opening_balance,
            spending_limit,
            opened_at,
        };
        self.accounts
            .insert(id.to_be_bytes(), Self::encode(&account)?)?;
        self.flush()?;
        Ok(account)
    }

    fn account(&self, id: AccountId) -> Result<Option<Account>, BankError> {
        self.load_account(id)
    }

    fn account_exists(&self, id: AccountId) -> Result<bool, BankError> {
        Ok(self.accounts.get(id.to_be_bytes())?.is_some())
    }

    fn balance(&self, id: AccountId) -> Result<Decimal, BankError> {
        self.load_account(id)?
            .map(|account| account.balance)
            .ok_or_else(|| BankError::account_not_found(id))
    }

    fn accounts_for_user(&self, user: UserId) -> Result<Vec<Account>, BankError> {
        let mut accounts = self.scan_accounts()?;
        accounts.retain(|account| account.user == user);
        Ok(accounts)
    }

    fn interest_bearing_accounts(&self) -> Result<Vec<Account>, BankError> {
        let mut accounts = self.scan_accounts()?;
        accounts.retain(|account| account.kind.bears_interest());
        Ok(accounts)
    }

    fn set_spending_limit(
        &self,
        id: AccountId,
        limit: Option<Decimal>,
    ) -> Result<(), BankError> {
        let mut account = self
            .load_account(id)?
            .ok_or_else(|| BankError::account_not_found(id))?;
        account.spending_limit = limit;
        self.accounts
            .insert(id.to_be_bytes(), Self::encode(&account)?)?;
        self.flush()
    }

    fn delete_account(&self, id: AccountId) -> Result<(), BankError> {
        let account = self
            .load_account(id)?
            .ok_or_else(|| BankError::account_not_found(id))?;
        if account.balance != Decimal::ZERO {
            return Err(BankError::balance_not_zero(id, account.balance));
        }

        // Collect the transaction keys to cascade, then remove everything in
        // one multi-tree transaction
        let mut doomed = Vec::new();
        for entry in self.transactions.iter() {
            let (key, raw) = entry?;
            let record: TransactionRecord = Self::decode(&raw)?;
            if record.from == id || record.to == id {
                doomed.push(key.to_vec());
            }
        }

        let result = (&self.accounts, &self.transactions).transaction(
            |(accounts, transactions)| {
                accounts.remove(id.to_be_bytes().to_vec())?;
                for key in &doomed {
                    transactions.remove(key.clone())?;
                }
                Ok::<_, ConflictableTransactionError<BankError>>(())
            },
        );

        match result {
            Ok(()) => self.flush(),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(BankError::storage(e.to_string())),
        }
    }

    fn atomic_transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError> {
        let abort = ConflictableTransactionError::Abort;

        let result = (&self.accounts, &self.transactions).transaction(
            |(accounts, transactions)| {
                // Re-read the sender's persisted balance inside the
                // transaction scope
                let raw = accounts
                    .get(from.to_be_bytes())?
                    .ok_or_else(|| abort(BankError::account_not_found(from)))?;
                let mut sender: Account =
                    Self::decode(&raw).map_err(|e| abort(BankError::storage(e.to_string())))?;

                let raw = accounts
                    .get(to.to_be_bytes())?
                    .ok_or_else(|| abort(BankError::recipient_not_found(to)))?;
                let mut recipient: Account =
                    Self::decode(&raw).map_err(|e| abort(BankError::storage(e.to_string())))?;

                if amount <= Decimal::ZERO {
                    return Err(abort(BankError::invalid_amount(amount)));
                }

                sender.balance -= amount;
                recipient.balance += amount;

                let sender_bytes = Self::encode(&sender)
                    .map_err(|e| abort(BankError::storage(e.to_string())))?;
                let recipient_bytes = Self::encode(&recipient)
                    .map_err(|e| abort(BankError::storage(e.to_string())))?;
                accounts.insert(from.to_be_bytes().to_vec(), sender_bytes)?;
                accounts.insert(to.to_be_bytes().to_vec(), recipient_bytes)?;

                let id = transactions.generate_id()?;
                let record = TransactionRecord {
                    id,
                    from,
                    to,
                    amount,
                    timestamp: at,
                };
                let record_bytes = Self::encode(&record)
                    .map_err(|e| abort(BankError::storage(e.to_string())))?;
                transactions.insert(id.to_be_bytes().to_vec(), record_bytes)?;

                Ok(record)
            },
        );

        match result {
            Ok(record) => {
                self.db
                    .flush()
                    .map_err(|e| BankError::transfer_failed(e.to_string()))?;
                Ok(record)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(BankError::transfer_failed(e.to_string())),
        }
    }

    fn atomic_self_credit(
        &self,
        account: AccountId,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<TransactionRecord, BankError> {
        let abort = ConflictableTransactionError::Abort;

        let result = (&self.accounts, &self.transactions).transaction(
            |(accounts, transactions)| {
                let raw = accounts
                    .get(account.to_be_bytes())?
                    .ok_or_else(|| abort(BankError::account_not_found(account)))?;
                let mut entry: Account =
                    Self::decode(&raw).map_err(|e| abort(BankError::storage(e.to_string())))?;

                entry.balance += delta;
                let entry_bytes = Self::encode(&entry)
                    .map_err(|e| abort(BankError::storage(e.to_string())))?;
                accounts.insert(account.to_be_bytes().to_vec(), entry_bytes)?;

                let id = transactions.generate_id()?;
                let record = TransactionRecord {
                    id,
                    from: account,
                    to: account,
                    amount: delta,
                    timestamp: at,
                };
                let record_bytes = Self::encode(&record)
                    .map_err(|e| abort(BankError::storage(e.to_string())))?;
                transactions.insert(id.to_be_bytes().to_vec(), record_bytes)?;

                Ok(record)
            },
        );

        match result {
            Ok(record) => {
                self.db
                    .flush()
                    .map_err(|e| BankError::transfer_failed(e.to_string()))?;
                Ok(record)
            }
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(BankError::transfer_failed(e.to_string())),
        }
    }

    fn history(&self, account: AccountId) -> Result<Vec<TransactionRecord>, BankError> {
        if !self.account_exists(account)? {
            return Err(BankError::account_not_found(account));
        }

        let mut records = Vec::new();
        for entry in self.transactions.iter() {
            let (_, raw) = entry?;
            let record: TransactionRecord = Self::decode(&raw)?;
            if record.from == account || record.to == account {
                records.push(record);
            }
        }
        records.sort_by_key(|record| (record.timestamp, record.id));
        Ok(records)
    }
}
