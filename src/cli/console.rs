//! Line-oriented console front end
//!
//! A thin shell over the [`Bank`] API: it parses one command per line,
//! invokes the core operation and prints the result or the error. No
//! business rules live here; every check happens in the core.

use crate::core::Bank;
use crate::io::export_history_to_file;
use crate::types::{AccountId, AccountKind, BankError, UserId, UserRole};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const HELP: &str = "\
Commands:
  register <user-id> <name> [role] [child]   register a user (role: client|banker|admin)
  open <user-id> <kind> [limit]              open an account (kind: debit|credit|saving|childsaving)
  accounts <user-id>                         list a user's accounts
  balance <account-id>                       show an account balance
  transfer <from> <to> <amount>              move funds between accounts
  history <account-id>                       print the transaction history
  export <account-id> <file>                 export the history as CSV
  close <account-id>                         close an account (balance must be 0)
  limit <acting-user> <account> <amount|none>  set or clear a spending limit
  reload-config                              re-read the configuration file
  help                                       this text
  quit                                       exit";

/// Run the console until end of input or `quit`
pub async fn run(bank: Arc<Bank>) -> Result<(), BankError> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"bank-ledger console; type 'help' for commands\n")
        .await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if matches!(words[0], "quit" | "exit") {
            break;
        }

        let reply = match dispatch(&bank, &words) {
            Ok(reply) => reply,
            Err(e) => format!("Error: {}", e),
        };
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    Ok(())
}

/// Execute one parsed command against the bank
///
/// Malformed input produces a friendly message; core failures propagate as
/// [`BankError`] so the caller prints their specific text.
fn dispatch(bank: &Bank, words: &[&str]) -> Result<String, BankError> {
    match words {
        ["help"] => Ok(HELP.to_string()),

        ["register", id, name, rest @ ..] => {
            let Some(id) = parse_id::<UserId>(id) else {
                return Ok(format!("Invalid user id '{}'", id));
            };
            let role = rest
                .first()
                .map(|word| UserRole::parse(word))
                .unwrap_or(UserRole::Client);
            let is_child = rest.contains(&"child");
            let user = bank.register_user(id, *name, role, is_child)?;
            Ok(format!("Registered user {} ({})", user.id, user.name))
        }

        ["open", user, kind, rest @ ..] => {
            let Some(user) = parse_id::<UserId>(user) else {
                return Ok(format!("Invalid user id '{}'", user));
            };
            let Some(kind) = AccountKind::parse(kind) else {
                return Ok(format!(
                    "Unknown account kind '{}'; use debit|credit|saving|childsaving",
                    kind
                ));
            };
            let limit = match rest.first() {
                Some(word) => match parse_amount(word) {
                    Some(limit) => Some(limit),
                    None => return Ok(format!("Invalid limit '{}'", word)),
                },
                None => None,
            };
            let account = bank.open_account(user, kind, limit)?;
            Ok(format!(
                "Opened {} account {} with balance {}",
                account.kind, account.id, account.balance
            ))
        }

        ["accounts", user] => {
            let Some(user) = parse_id::<UserId>(user) else {
                return Ok(format!("Invalid user id '{}'", user));
            };
            let accounts = bank.accounts_for_user(user)?;
            if accounts.is_empty() {
                return Ok("No accounts".to_string());
            }
            Ok(accounts
                .iter()
                .map(|account| {
                    format!(
                        "Account {}: {} balance {} limit {}",
                        account.id,
                        account.kind,
                        account.balance,
                        account
                            .spending_limit
                            .map(|limit| limit.to_string())
                            .unwrap_or_else(|| "none".to_string())
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }

        ["balance", account] => {
            let Some(account) = parse_id::<AccountId>(account) else {
                return Ok(format!("Invalid account id '{}'", account));
            };
            Ok(format!("{}", bank.balance(account)?))
        }

        ["transfer", from, to, amount] => {
            let (Some(from), Some(to)) = (parse_id::<AccountId>(from), parse_id::<AccountId>(to))
            else {
                return Ok("Invalid account id".to_string());
            };
            let Some(amount) = parse_amount(amount) else {
                return Ok(format!("Invalid amount '{}'", amount));
            };
            let record = bank.transfer(from, to, amount)?;
            Ok(format!(
                "Transferred {} from {} to {} (transaction {})",
                record.amount, record.from, record.to, record.id
            ))
        }

        ["history", account] => {
            let Some(account) = parse_id::<AccountId>(account) else {
                return Ok(format!("Invalid account id '{}'", account));
            };
            let records = bank.history(account)?;
            if records.is_empty() {
                return Ok("No transactions".to_string());
            }
            Ok(records
                .iter()
                .map(|record| {
                    format!(
                        "{} {} {} -> {}: {}",
                        record.id, record.timestamp, record.from, record.to, record.amount
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }

        ["export", account, file] => {
            let Some(account) = parse_id::<AccountId>(account) else {
                return Ok(format!("Invalid account id '{}'", account));
            };
            let account = bank.account(account)?;
            let records = bank.history(account.id)?;
            let path = PathBuf::from(file);
            export_history_to_file(&path, &account, &records)?;
            Ok(format!("Exported {} transactions to {}", records.len(), file))
        }

        ["close", account] => {
            let Some(account) = parse_id::<AccountId>(account) else {
                return Ok(format!("Invalid account id '{}'", account));
            };
            bank.close_account(account)?;
            Ok(format!("Account {} closed", account))
        }

        ["limit", acting, account, value] => {
            let (Some(acting), Some(account)) =
                (parse_id::<UserId>(acting), parse_id::<AccountId>(account))
            else {
                return Ok("Invalid id".to_string());
            };
            let limit = match *value {
                "none" => None,
                other => match parse_amount(other) {
                    Some(limit) => Some(limit),
                    None => return Ok(format!("Invalid limit '{}'", other)),
                },
            };
            bank.set_spending_limit(acting, account, limit)?;
            Ok("Spending limit updated".to_string())
        }

        ["reload-config"] => {
            bank.reload_config();
            Ok("Configuration reloaded".to_string())
        }

        _ => Ok(format!("Unknown command; type 'help'\n{}", HELP)),
    }
}

fn parse_id<T: std::str::FromStr>(word: &str) -> Option<T> {
    word.parse::<T>().ok()
}

fn parse_amount(word: &str) -> Option<Decimal> {
    word.parse::<Decimal>().ok()
}
