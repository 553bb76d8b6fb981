//! Account-related types for the banking ledger
//!
//! This module defines the closed set of account variants and the persisted
//! account state. Per-variant behavior (overdraft ceilings, interest rules,
//! child caps) lives in [`crate::core::policy`]; the types here only carry
//! the data the policy table is keyed by.

use super::transaction::{AccountId, UserId};
use crate::config::BankConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of account variants
///
/// Behavior differences between variants are resolved through the policy
/// table keyed by this tag rather than through virtual dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    /// Everyday account, no overdraft, no interest
    Debit,

    /// May go negative down to the effective limit; charged monthly interest
    /// on a negative time-weighted average balance
    Credit,

    /// Earns monthly interest on the time-weighted average balance
    Saving,

    /// A saving account for child users with hard per-transfer and daily
    /// spending caps layered on top of the saving accrual
    ChildSaving,
}

impl AccountKind {
    /// Whether the accrual scheduler computes interest for this variant
    pub fn bears_interest(&self) -> bool {
        matches!(
            self,
            AccountKind::Credit | AccountKind::Saving | AccountKind::ChildSaving
        )
    }

    /// Whether a child user may open an account of this variant
    pub fn allowed_for_child(&self) -> bool {
        matches!(self, AccountKind::Debit | AccountKind::ChildSaving)
    }

    /// Parse a variant from its display name, case-insensitively
    ///
    /// Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debit" => Some(AccountKind::Debit),
            "credit" => Some(AccountKind::Credit),
            "saving" => Some(AccountKind::Saving),
            "childsaving" | "child-saving" => Some(AccountKind::ChildSaving),
            _ => None,
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountKind::Debit => "Debit",
            AccountKind::Credit => "Credit",
            AccountKind::Saving => "Saving",
            AccountKind::ChildSaving => "ChildSaving",
        };
        write!(f, "{}", name)
    }
}

/// Persisted account state
///
/// The balance is mutated only through the transfer engine's atomic update;
/// everything else is set at opening or through capability-checked
/// maintenance operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned account identifier
    pub id: AccountId,

    /// The owning user
    pub user: UserId,

    /// Variant tag driving the policy table
    pub kind: AccountKind,

    /// Current balance
    ///
    /// Non-credit variants never go negative; credit variants never go below
    /// `-effective_limit`.
    pub balance: Decimal,

    /// Explicit per-account spending limit, overriding the configured default
    /// maximum debit for credit accounts
    pub spending_limit: Option<Decimal>,

    /// When the account was opened
    pub opened_at: DateTime<Utc>,
}

impl Account {
    /// The overdraft ceiling actually enforced for this account
    ///
    /// Credit accounts use the explicit limit if one is set, else the
    /// configured default maximum debit. All other variants cannot go
    /// negative at all, regardless of any stored limit.
    pub fn effective_limit(&self, config: &BankConfig) -> Decimal {
        match self.kind {
            AccountKind::Credit => self.spending_limit.unwrap_or(config.spending_limit),
            _ => Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn account(kind: AccountKind, spending_limit: Option<Decimal>) -> Account {
        Account {
            id: 1,
            user: 1,
            kind,
            balance: Decimal::ZERO,
            spending_limit,
            opened_at: Utc::now(),
        }
    }

    #[rstest]
    #[case::debit(AccountKind::Debit, false)]
    #[case::credit(AccountKind::Credit, true)]
    #[case::saving(AccountKind::Saving, true)]
    #[case::child_saving(AccountKind::ChildSaving, true)]
    fn test_bears_interest(#[case] kind: AccountKind, #[case] expected: bool) {
        assert_eq!(kind.bears_interest(), expected);
    }

    #[rstest]
    #[case::debit(AccountKind::Debit, true)]
    #[case::credit(AccountKind::Credit, false)]
    #[case::saving(AccountKind::Saving, false)]
    #[case::child_saving(AccountKind::ChildSaving, true)]
    fn test_allowed_for_child(#[case] kind: AccountKind, #[case] expected: bool) {
        assert_eq!(kind.allowed_for_child(), expected);
    }

    #[rstest]
    #[case("debit", Some(AccountKind::Debit))]
    #[case("Credit", Some(AccountKind::Credit))]
    #[case("SAVING", Some(AccountKind::Saving))]
    #[case("childsaving", Some(AccountKind::ChildSaving))]
    #[case("child-saving", Some(AccountKind::ChildSaving))]
    #[case("checking", None)]
    fn test_parse(#[case] input: &str, #[case] expected: Option<AccountKind>) {
        assert_eq!(AccountKind::parse(input), expected);
    }

    #[test]
    fn test_effective_limit_credit_uses_explicit_limit() {
        let config = BankConfig::default();
        let acc = account(AccountKind::Credit, Some(Decimal::new(500, 0)));
        assert_eq!(acc.effective_limit(&config), Decimal::new(500, 0));
    }

    #[test]
    fn test_effective_limit_credit_falls_back_to_config() {
        let config = BankConfig::default();
        let acc = account(AccountKind::Credit, None);
        assert_eq!(acc.effective_limit(&config), config.spending_limit);
    }

    #[rstest]
    #[case::debit(AccountKind::Debit)]
    #[case::saving(AccountKind::Saving)]
    #[case::child_saving(AccountKind::ChildSaving)]
    fn test_effective_limit_non_credit_is_zero_even_with_explicit_limit(
        #[case] kind: AccountKind,
    ) {
        let config = BankConfig::default();
        let acc = account(kind, Some(Decimal::new(200, 0)));
        assert_eq!(acc.effective_limit(&config), Decimal::ZERO);
    }
}
