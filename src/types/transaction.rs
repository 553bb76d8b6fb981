//! Transaction-related types for the banking ledger
//!
//! This module defines the identifier aliases and the immutable transaction
//! record produced by every committed funds movement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// User identifier
///
/// Caller-supplied at registration (a national id number in the original
/// deployment). Supports user IDs from 0 to 4,294,967,295.
pub type UserId = u32;

/// Account identifier, assigned by the ledger store
pub type AccountId = u64;

/// Transaction identifier, assigned by the ledger store
pub type TransactionId = u64;

/// An immutable record of a committed funds movement
///
/// Two shapes exist:
///
/// - **Transfer**: `from != to`, `amount > 0`. Funds moved between two
///   distinct accounts.
/// - **Interest posting**: `from == to`, `amount` carries the signed accrual
///   delta (negative for credit interest charged on an overdrawn average).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique transaction identifier
    pub id: TransactionId,

    /// The account debited (or the posting account for interest)
    pub from: AccountId,

    /// The account credited (or the posting account for interest)
    pub to: AccountId,

    /// Transfer amount, or signed interest delta for self-referential postings
    pub amount: Decimal,

    /// Commit time of the atomic unit that produced this record
    pub timestamp: DateTime<Utc>,
}

impl TransactionRecord {
    /// Whether this record is a self-referential interest posting
    pub fn is_interest_posting(&self) -> bool {
        self.from == self.to
    }

    /// The signed amount from the perspective of `account`
    ///
    /// Outgoing transfers are negative, incoming transfers positive, and
    /// interest postings keep their stored sign.
    pub fn signed_amount_for(&self, account: AccountId) -> Decimal {
        if self.is_interest_posting() || self.to == account {
            self.amount
        } else {
            -self.amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(from: AccountId, to: AccountId, amount: Decimal) -> TransactionRecord {
        TransactionRecord {
            id: 1,
            from,
            to,
            amount,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_interest_posting_detection() {
        assert!(record(3, 3, Decimal::new(25, 1)).is_interest_posting());
        assert!(!record(3, 4, Decimal::new(25, 1)).is_interest_posting());
    }

    #[test]
    fn test_signed_amount_for_sender_is_negative() {
        let r = record(1, 2, Decimal::new(3000, 2));
        assert_eq!(r.signed_amount_for(1), Decimal::new(-3000, 2));
        assert_eq!(r.signed_amount_for(2), Decimal::new(3000, 2));
    }

    #[test]
    fn test_signed_amount_keeps_interest_sign() {
        let r = record(5, 5, Decimal::new(-100, 2));
        assert_eq!(r.signed_amount_for(5), Decimal::new(-100, 2));
    }
}
