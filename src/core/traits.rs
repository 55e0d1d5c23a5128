//! Core traits for the ledger's external collaborators
//!
//! The core never owns persistence, locking or time directly. It consumes them
//! through these traits so an in-memory implementation can back tests and the
//! batch driver while a production deployment plugs in a database, a
//! distributed lock service and the system clock.

use crate::types::{
    Account, AccountId, AccountNumber, AccountUser, LedgerError, Transaction, TransactionId,
    UserId,
};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Repository-style access to users, accounts and ledger entries
///
/// Lookups return `None` when the record does not exist; callers translate
/// that into the appropriate `*NotFound` error. All methods must be safe to
/// call from many threads at once.
pub trait LedgerStore: Send + Sync {
    /// Register a user
    ///
    /// # Errors
    ///
    /// Returns `DuplicateUser` if the id is already taken.
    fn save_user(&self, user: AccountUser) -> Result<AccountUser, LedgerError>;

    /// Find a user by id
    fn find_user_by_id(&self, user_id: UserId) -> Option<AccountUser>;

    /// Find an account by its public number
    fn find_account_by_number(&self, account_number: &AccountNumber) -> Option<Account>;

    /// Highest account number handed out so far, if any
    fn find_highest_account_number(&self) -> Option<AccountNumber>;

    /// Number of accounts owned by a user, closed accounts included
    fn count_accounts_for_user(&self, user_id: UserId) -> usize;

    /// All accounts owned by a user, in creation order
    fn find_accounts_for_user(&self, user_id: UserId) -> Vec<Account>;

    /// Allocate a fresh surrogate account id
    fn next_account_id(&self) -> AccountId;

    /// Insert or replace an account, keyed by account number
    fn save_account(&self, account: Account) -> Result<Account, LedgerError>;

    /// Find a ledger entry by transaction id
    fn find_transaction_by_id(&self, transaction_id: &TransactionId) -> Option<Transaction>;

    /// Append a ledger entry
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTransaction` if an entry with the same id exists;
    /// ledger entries are never overwritten.
    fn save_transaction(&self, transaction: Transaction) -> Result<Transaction, LedgerError>;
}

/// Named mutex provider
///
/// Keys are arbitrary strings. Implementations backed by a shared service must
/// serialize holders across processes, not only across threads.
pub trait NamedMutex: Send + Sync {
    /// Try to take the mutex for `key`
    ///
    /// Blocks for at most `wait` and returns `false` if the mutex could not be
    /// taken in that time. Once taken, the mutex is released automatically
    /// after `hold` if the holder never calls [`NamedMutex::release`].
    fn try_acquire(&self, key: &str, wait: Duration, hold: Duration) -> bool;

    /// Release the mutex for `key` held by the caller
    fn release(&self, key: &str);
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
