//! Transaction history export
//!
//! Writes an account's transaction history as CSV, one row per transaction
//! from the account's perspective: outgoing transfers show the counterparty
//! and a negative amount, incoming transfers a positive one, and interest
//! postings keep their stored sign.
//!
//! The writer-based function is pure (no file I/O) for easy testing.

use crate::types::{Account, BankError, TransactionRecord};
use std::io::Write;
use std::path::Path;

/// Write an account's history as CSV
///
/// Columns: `transaction, timestamp, direction, counterparty, amount`.
/// Records are written in the order given, which the store already returns
/// timestamp ascending.
///
/// # Arguments
///
/// * `account` - The account whose perspective the rows take
/// * `records` - The transaction records to write
/// * `output` - Destination writer
///
/// # Errors
///
/// Returns `Storage` if writing fails.
pub fn write_history_csv(
    account: &Account,
    records: &[TransactionRecord],
    output: &mut dyn Write,
) -> Result<(), BankError> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["transaction", "timestamp", "direction", "counterparty", "amount"])
        .map_err(|e| BankError::storage(e.to_string()))?;

    for record in records {
        let (direction, counterparty) = if record.is_interest_posting() {
            ("interest", record.from)
        } else if record.from == account.id {
            ("sent", record.to)
        } else {
            ("received", record.from)
        };

        writer
            .write_record(&[
                record.id.to_string(),
                record.timestamp.to_rfc3339(),
                direction.to_string(),
                counterparty.to_string(),
                record.signed_amount_for(account.id).to_string(),
            ])
            .map_err(|e| BankError::storage(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| BankError::storage(e.to_string()))?;
    Ok(())
}

/// Export an account's history to a CSV file
pub fn export_history_to_file(
    path: &Path,
    account: &Account,
    records: &[TransactionRecord],
) -> Result<(), BankError> {
    let mut file = std::fs::File::create(path)?;
    write_history_csv(account, records, &mut file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountKind, TransactionId};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    fn account(id: u64) -> Account {
        Account {
            id,
            user: 1,
            kind: AccountKind::Saving,
            balance: Decimal::new(1000, 0),
            spending_limit: None,
            opened_at: t(0),
        }
    }

    fn record(
        id: TransactionId,
        from: u64,
        to: u64,
        amount: Decimal,
        seconds: i64,
    ) -> TransactionRecord {
        TransactionRecord {
            id,
            from,
            to,
            amount,
            timestamp: t(seconds),
        }
    }

    #[test]
    fn test_write_empty_history() {
        let mut output = Vec::new();
        write_history_csv(&account(1), &[], &mut output).unwrap();

        let written = String::from_utf8(output).unwrap();
        assert_eq!(
            written,
            "transaction,timestamp,direction,counterparty,amount\n"
        );
    }

    #[test]
    fn test_write_history_rows() {
        let records = vec![
            record(1, 1, 2, Decimal::new(300, 0), 10),
            record(2, 3, 1, Decimal::new(50, 0), 20),
            record(3, 1, 1, Decimal::new(25, 1), 30),
        ];

        let mut output = Vec::new();
        write_history_csv(&account(1), &records, &mut output).unwrap();

        let written = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "1,2024-01-01T00:00:10+00:00,sent,2,-300");
        assert_eq!(lines[2], "2,2024-01-01T00:00:20+00:00,received,3,50");
        assert_eq!(lines[3], "3,2024-01-01T00:00:30+00:00,interest,1,2.5");
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let records = vec![record(1, 1, 2, Decimal::new(10, 0), 5)];

        export_history_to_file(&path, &account(1), &records).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("sent,2,-10"));
    }
}
