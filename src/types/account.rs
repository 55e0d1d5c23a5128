//! Account-related types for the account ledger
//!
//! This module defines account owners, the account entity itself, the
//! 10-digit account number, and the flat projections handed to callers.

use super::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User identifier
pub type UserId = u64;

/// Surrogate account identifier, assigned by the ledger store
pub type AccountId = u64;

/// Account balance in the smallest currency unit
pub type Balance = u64;

/// Maximum number of accounts a single user may own
///
/// Unregistered accounts still count toward this cap.
pub const MAX_ACCOUNTS_PER_USER: usize = 10;

/// Owner of one or more accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: UserId,
    pub name: String,
}

impl AccountUser {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Public account number
///
/// Always exactly 10 ASCII digits. Numbers are handed out in strictly
/// increasing order starting at [`AccountNumber::FIRST`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Number assigned to the very first account
    pub const FIRST: u64 = 1_000_000_000;

    /// Number of digits in every account number
    pub const LENGTH: usize = 10;

    /// The seed account number, `"1000000000"`
    pub fn first() -> Self {
        AccountNumber(Self::FIRST.to_string())
    }

    /// Numeric value of this account number
    pub fn value(&self) -> u64 {
        // Construction guarantees 10 ASCII digits, which always fit in a u64
        self.0.bytes().fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'))
    }

    /// The number following this one
    ///
    /// # Errors
    ///
    /// Returns `AccountNumberExhausted` once `9999999999` has been handed out.
    pub fn next(&self) -> Result<Self, LedgerError> {
        let next = self.value() + 1;
        if next > 9_999_999_999 {
            return Err(LedgerError::AccountNumberExhausted);
        }
        Ok(AccountNumber(next.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountNumber {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::LENGTH || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LedgerError::invalid_account_number(s));
        }
        Ok(AccountNumber(s.to_string()))
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an account
///
/// An account starts `InUse` and moves to `Unregistered` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    InUse,
    Unregistered,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::InUse => "IN_USE",
            AccountStatus::Unregistered => "UNREGISTERED",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Customer account state
///
/// The balance is unsigned, so the non-negative invariant holds by
/// construction; every mutation goes through checked arithmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Surrogate id assigned by the store
    pub id: AccountId,

    /// Owner of the account; never changes
    pub user_id: UserId,

    pub account_number: AccountNumber,

    pub status: AccountStatus,

    pub balance: Balance,

    /// Set once when the account is created
    pub registered_at: DateTime<Utc>,

    /// Set once when the account is closed
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create a new `InUse` account
    pub fn new(
        id: AccountId,
        user_id: UserId,
        account_number: AccountNumber,
        balance: Balance,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Account {
            id,
            user_id,
            account_number,
            status: AccountStatus::InUse,
            balance,
            registered_at,
            unregistered_at: None,
        }
    }

    pub fn is_in_use(&self) -> bool {
        self.status == AccountStatus::InUse
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Debit the balance
    ///
    /// # Errors
    ///
    /// Returns `AmountExceedsBalance` if the amount is larger than the balance.
    /// The balance is left untouched on error.
    pub fn use_balance(&mut self, amount: Balance) -> Result<(), LedgerError> {
        self.balance = self.balance.checked_sub(amount).ok_or_else(|| {
            LedgerError::amount_exceeds_balance(&self.account_number, self.balance, amount)
        })?;
        Ok(())
    }

    /// Credit the balance
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the new balance would not fit.
    pub fn cancel_balance(&mut self, amount: Balance) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("cancel_balance", &self.account_number))?;
        Ok(())
    }

    /// Move the account to `Unregistered`
    pub fn unregister(&mut self, at: DateTime<Utc>) {
        self.status = AccountStatus::Unregistered;
        self.unregistered_at = Some(at);
    }
}

/// Full public projection of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountDto {
    pub user_id: UserId,
    pub account_number: AccountNumber,
    pub status: AccountStatus,
    pub balance: Balance,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountDto {
    fn from(account: &Account) -> Self {
        AccountDto {
            user_id: account.user_id,
            account_number: account.account_number.clone(),
            status: account.status,
            balance: account.balance,
            registered_at: account.registered_at,
            unregistered_at: account.unregistered_at,
        }
    }
}

/// Lightweight projection returned by account listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub account_number: AccountNumber,
    pub balance: Balance,
}

impl From<&Account> for AccountInfo {
    fn from(account: &Account) -> Self {
        AccountInfo {
            account_number: account.account_number.clone(),
            balance: account.balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn account(balance: Balance) -> Account {
        Account::new(1, 1, AccountNumber::first(), balance, Utc::now())
    }

    #[rstest]
    #[case::seed("1000000000")]
    #[case::padded_whitespace(" 1000000012 ")]
    #[case::upper_bound("9999999999")]
    fn test_parse_valid_account_number(#[case] input: &str) {
        let number: AccountNumber = input.parse().unwrap();
        assert_eq!(number.as_str(), input.trim());
    }

    #[rstest]
    #[case::too_short("123")]
    #[case::too_long("10000000000")]
    #[case::letters("10000000ab")]
    #[case::empty("")]
    #[case::negative("-100000000")]
    fn test_parse_invalid_account_number(#[case] input: &str) {
        let result: Result<AccountNumber, _> = input.parse();
        assert!(matches!(
            result.unwrap_err(),
            LedgerError::InvalidAccountNumber { .. }
        ));
    }

    #[test]
    fn test_next_account_number() {
        let number: AccountNumber = "1000000012".parse().unwrap();
        assert_eq!(number.next().unwrap().as_str(), "1000000013");
        assert_eq!(AccountNumber::first().value(), 1_000_000_000);
    }

    #[test]
    fn test_next_account_number_exhausted() {
        let number: AccountNumber = "9999999999".parse().unwrap();
        assert_eq!(
            number.next().unwrap_err(),
            LedgerError::AccountNumberExhausted
        );
    }

    #[test]
    fn test_use_balance_debits() {
        let mut account = account(10_000);
        account.use_balance(200).unwrap();
        assert_eq!(account.balance, 9_800);
    }

    #[test]
    fn test_use_balance_exceeding_leaves_balance_untouched() {
        let mut account = account(100);
        let result = account.use_balance(101);
        assert!(matches!(
            result.unwrap_err(),
            LedgerError::AmountExceedsBalance { .. }
        ));
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_cancel_balance_overflow() {
        let mut account = account(u64::MAX);
        let result = account.cancel_balance(1);
        assert!(matches!(
            result.unwrap_err(),
            LedgerError::ArithmeticOverflow { .. }
        ));
        assert_eq!(account.balance, u64::MAX);
    }

    #[test]
    fn test_unregister_sets_status_and_timestamp() {
        let mut account = account(0);
        let at = Utc::now();
        account.unregister(at);
        assert_eq!(account.status, AccountStatus::Unregistered);
        assert_eq!(account.unregistered_at, Some(at));
        assert!(!account.is_in_use());
    }

    #[test]
    fn test_projections_hide_surrogate_id() {
        let account = account(500);
        let info = AccountInfo::from(&account);
        assert_eq!(info.account_number.as_str(), "1000000000");
        assert_eq!(info.balance, 500);

        let dto = AccountDto::from(&account);
        assert_eq!(dto.status, AccountStatus::InUse);
        assert_eq!(dto.unregistered_at, None);
    }
}
