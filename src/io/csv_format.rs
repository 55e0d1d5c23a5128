//! CSV format handling for command records, users and ledger output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvCommandRecord and UserRecord structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account and transaction output serialization
//!
//! All functions are pure (no file I/O) for easy testing.

use crate::types::{
    Account, AccountNumber, AccountUser, CommandRecord, CommandType, Transaction, UserId,
};
use chrono::SecondsFormat;
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for command rows
///
/// Matches the input CSV format with columns: op, user, account, amount, ref.
/// Every column but `op` is optional because each operation uses a
/// different subset.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvCommandRecord {
    pub op: String,
    pub user: Option<String>,
    pub account: Option<String>,
    pub amount: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// CSV record structure for the users file (`id,name`)
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
}

impl From<UserRecord> for AccountUser {
    fn from(record: UserRecord) -> Self {
        AccountUser::new(record.id, record.name)
    }
}

/// Treat empty or whitespace-only cells as absent
fn present(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Convert a CsvCommandRecord to a CommandRecord
///
/// This function:
/// - Parses the operation name into a CommandType (case insensitive)
/// - Parses user ids and amounts as unsigned integers
/// - Parses account numbers into validated 10-digit AccountNumbers
/// - Checks that every field the operation needs is present
///
/// Amounts are only checked for being whole non-negative numbers here; the
/// transaction amount range is enforced by the ledger so that an out-of-range
/// request still leaves a failure entry.
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(CommandRecord) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvCommandRecord) -> Result<CommandRecord, String> {
    let command = match csv_record.op.trim().to_lowercase().as_str() {
        "create" => CommandType::Create,
        "close" => CommandType::Close,
        "use" => CommandType::Use,
        "cancel" => CommandType::Cancel,
        _ => return Err(format!("Invalid operation: '{}'", csv_record.op)),
    };

    let user = present(csv_record.user)
        .map(|user| {
            user.parse::<UserId>()
                .map_err(|_| format!("Invalid user id '{}'", user))
        })
        .transpose()?;

    let account = present(csv_record.account)
        .map(|account| {
            account
                .parse::<AccountNumber>()
                .map_err(|e| e.to_string())
        })
        .transpose()?;

    let amount = present(csv_record.amount)
        .map(|amount| {
            amount
                .parse::<u64>()
                .map_err(|_| format!("Invalid amount '{}'", amount))
        })
        .transpose()?;

    let reference = present(csv_record.reference);

    let missing = |field: &str| format!("{:?} command requires '{}'", command, field);
    match command {
        CommandType::Create => {
            user.ok_or_else(|| missing("user"))?;
        }
        CommandType::Close => {
            user.ok_or_else(|| missing("user"))?;
            account.as_ref().ok_or_else(|| missing("account"))?;
        }
        CommandType::Use => {
            user.ok_or_else(|| missing("user"))?;
            account.as_ref().ok_or_else(|| missing("account"))?;
            amount.ok_or_else(|| missing("amount"))?;
        }
        CommandType::Cancel => {
            account.as_ref().ok_or_else(|| missing("account"))?;
            amount.ok_or_else(|| missing("amount"))?;
            reference.as_ref().ok_or_else(|| missing("ref"))?;
        }
    }

    Ok(CommandRecord {
        command,
        user,
        account,
        amount,
        reference,
    })
}

/// Write account states to CSV format
///
/// Writes accounts with columns: account, user, status, balance.
/// Accounts are sorted by account number for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "user", "status", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.account_number.to_string(),
                account.user_id.to_string(),
                account.status.to_string(),
                account.balance.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write ledger entries to CSV format
///
/// Writes entries with columns: transaction_id, account, type, result,
/// amount, balance_snapshot, transaction_at. Entries are written in the
/// order given; timestamps are RFC 3339 with millisecond precision.
pub fn write_transactions_csv(
    transactions: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record([
            "transaction_id",
            "account",
            "type",
            "result",
            "amount",
            "balance_snapshot",
            "transaction_at",
        ])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for tx in transactions {
        writer
            .write_record(&[
                tx.transaction_id.to_string(),
                tx.account_number.to_string(),
                tx.transaction_type.to_string(),
                tx.result_type.to_string(),
                tx.amount.to_string(),
                tx.balance_snapshot.to_string(),
                tx.transaction_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            ])
            .map_err(|e| format!("Failed to write transaction record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionId, TransactionResultType, TransactionType};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn record(op: &str, user: &str, account: &str, amount: &str, reference: &str) -> CsvCommandRecord {
        CsvCommandRecord {
            op: op.to_string(),
            user: Some(user.to_string()),
            account: Some(account.to_string()),
            amount: Some(amount.to_string()),
            reference: Some(reference.to_string()),
        }
    }

    fn account(number: &str, user_id: UserId, balance: u64, closed: bool) -> Account {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut account = Account::new(1, user_id, number.parse().unwrap(), balance, at);
        if closed {
            account.unregister(at);
        }
        account
    }

    #[rstest]
    #[case::create(record("create", "1", "", "1000", ""), CommandType::Create)]
    #[case::create_without_balance(record("create", "1", "", "", ""), CommandType::Create)]
    #[case::close(record("close", "1", "1000000000", "", ""), CommandType::Close)]
    #[case::use_with_ref(record("use", "1", "1000000000", "200", "a"), CommandType::Use)]
    #[case::use_without_ref(record("use", "1", "1000000000", "200", ""), CommandType::Use)]
    #[case::cancel(record("cancel", "", "1000000000", "200", "a"), CommandType::Cancel)]
    #[case::case_insensitive(record("USE", "1", "1000000000", "200", ""), CommandType::Use)]
    fn test_convert_csv_record_valid(
        #[case] csv_record: CsvCommandRecord,
        #[case] expected: CommandType,
    ) {
        let result = convert_csv_record(csv_record);
        assert_eq!(result.unwrap().command, expected);
    }

    #[test]
    fn test_convert_csv_record_fields() {
        let command = convert_csv_record(record("use", " 7 ", "1000000012", " 200 ", "pay"))
            .unwrap();

        assert_eq!(command.user, Some(7));
        assert_eq!(command.account, Some("1000000012".parse::<AccountNumber>().unwrap()));
        assert_eq!(command.amount, Some(200));
        assert_eq!(command.reference.as_deref(), Some("pay"));
    }

    #[test]
    fn test_convert_csv_record_empty_cells_are_absent() {
        let command = convert_csv_record(record("create", "1", " ", "", "")).unwrap();

        assert_eq!(command.account, None);
        assert_eq!(command.amount, None);
        assert_eq!(command.reference, None);
    }

    #[rstest]
    #[case::invalid_op(record("deposit", "1", "", "100", ""), "Invalid operation")]
    #[case::invalid_user(record("create", "bob", "", "100", ""), "Invalid user id")]
    #[case::negative_amount(record("use", "1", "1000000000", "-5", ""), "Invalid amount")]
    #[case::fractional_amount(record("use", "1", "1000000000", "1.5", ""), "Invalid amount")]
    #[case::short_account(record("close", "1", "12345", "", ""), "Invalid account number")]
    #[case::create_missing_user(record("create", "", "", "100", ""), "requires 'user'")]
    #[case::close_missing_account(record("close", "1", "", "", ""), "requires 'account'")]
    #[case::use_missing_amount(record("use", "1", "1000000000", "", ""), "requires 'amount'")]
    #[case::cancel_missing_ref(record("cancel", "", "1000000000", "100", ""), "requires 'ref'")]
    fn test_convert_csv_record_errors(
        #[case] csv_record: CsvCommandRecord,
        #[case] expected_error: &str,
    ) {
        let result = convert_csv_record(csv_record);
        assert!(result.unwrap_err().contains(expected_error));
    }

    #[rstest]
    #[case::single_account(
        vec![account("1000000000", 1, 100, false)],
        "account,user,status,balance\n1000000000,1,IN_USE,100\n"
    )]
    #[case::sorted_by_account_number(
        vec![
            account("1000000002", 1, 0, false),
            account("1000000000", 2, 50, false),
            account("1000000001", 1, 0, true),
        ],
        "account,user,status,balance\n\
         1000000000,2,IN_USE,50\n\
         1000000001,1,UNREGISTERED,0\n\
         1000000002,1,IN_USE,0\n"
    )]
    #[case::empty_accounts(vec![], "account,user,status,balance\n")]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        let result = write_accounts_csv(&accounts, &mut output);
        assert!(result.is_ok());

        let output_str = String::from_utf8(output).unwrap();
        assert_eq!(output_str, expected_output);
    }

    #[test]
    fn test_write_transactions_csv() {
        let transactions = vec![Transaction {
            transaction_id: TransactionId::from("0123456789abcdef0123456789abcdef"),
            account_id: 1,
            account_number: "1000000012".parse().unwrap(),
            transaction_type: TransactionType::Use,
            result_type: TransactionResultType::Fail,
            amount: 200,
            balance_snapshot: 100,
            transaction_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        }];

        let mut output = Vec::new();
        write_transactions_csv(&transactions, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "transaction_id,account,type,result,amount,balance_snapshot,transaction_at\n\
             0123456789abcdef0123456789abcdef,1000000012,USE,FAIL,200,100,2024-03-01T12:30:00.000Z\n"
        );
    }

    #[test]
    fn test_user_record_conversion() {
        let user = AccountUser::from(UserRecord {
            id: 3,
            name: "Crong".to_string(),
        });
        assert_eq!(user, AccountUser::new(3, "Crong"));
    }
}
