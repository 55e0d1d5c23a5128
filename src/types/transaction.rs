//! Transaction-related types for the account ledger
//!
//! This module defines the ledger entry written for every attempted balance
//! mutation, its identifiers and enums, the amount policy, and the command
//! records consumed by the batch driver.

use super::account::{AccountId, AccountNumber, Balance, UserId};
use super::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction amount in the smallest currency unit
pub type Amount = u64;

/// Smallest amount accepted for a use or cancel
pub const MIN_TRANSACTION_AMOUNT: Amount = 10;

/// Largest amount accepted for a use or cancel
pub const MAX_TRANSACTION_AMOUNT: Amount = 1_000_000_000;

/// Check an amount against the transaction amount policy
///
/// # Errors
///
/// Returns `InvalidAmount` if the amount is outside
/// `MIN_TRANSACTION_AMOUNT..=MAX_TRANSACTION_AMOUNT`.
pub fn validate_amount(amount: Amount) -> Result<(), LedgerError> {
    if !(MIN_TRANSACTION_AMOUNT..=MAX_TRANSACTION_AMOUNT).contains(&amount) {
        return Err(LedgerError::invalid_amount(amount.to_string()));
    }
    Ok(())
}

/// Opaque transaction identifier
///
/// 32 lowercase hex characters, generated randomly when the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        TransactionId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId(value.to_string())
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId(value)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of balance mutation a transaction records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Debit against the account balance
    Use,

    /// Full reversal of an earlier use
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Use => "USE",
            TransactionType::Cancel => "CANCEL",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the attempted mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResultType {
    Success,
    Fail,
}

impl TransactionResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionResultType::Success => "SUCCESS",
            TransactionResultType::Fail => "FAIL",
        }
    }
}

impl fmt::Display for TransactionResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger entry
///
/// Written once per attempted mutation and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub transaction_id: TransactionId,

    /// Surrogate id of the account this entry belongs to
    pub account_id: AccountId,

    pub account_number: AccountNumber,

    pub transaction_type: TransactionType,

    pub result_type: TransactionResultType,

    pub amount: Amount,

    /// Balance after the effect for successes, balance at attempt time for failures
    pub balance_snapshot: Balance,

    pub transaction_at: DateTime<Utc>,
}

/// Public projection of a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDto {
    pub account_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub result_type: TransactionResultType,
    pub amount: Amount,
    pub balance_snapshot: Balance,
    pub transaction_id: TransactionId,
    pub transaction_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionDto {
    fn from(tx: &Transaction) -> Self {
        TransactionDto {
            account_number: tx.account_number.clone(),
            transaction_type: tx.transaction_type,
            result_type: tx.result_type,
            amount: tx.amount,
            balance_snapshot: tx.balance_snapshot,
            transaction_id: tx.transaction_id.clone(),
            transaction_at: tx.transaction_at,
        }
    }
}

/// Operations accepted by the batch driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    /// Open a new account for a user
    Create,

    /// Close an account with a zero balance
    Close,

    /// Debit an account
    Use,

    /// Reverse an earlier use
    Cancel,
}

/// Parsed command row
///
/// Field usage depends on the command type:
/// - `Create`: `user`, `amount` (initial balance)
/// - `Close`: `user`, `account`
/// - `Use`: `user`, `account`, `amount`, optional `reference` label
/// - `Cancel`: `account`, `amount`, `reference` naming an earlier use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub command: CommandType,
    pub user: Option<UserId>,
    pub account: Option<AccountNumber>,
    pub amount: Option<Amount>,
    pub reference: Option<String>,
}
