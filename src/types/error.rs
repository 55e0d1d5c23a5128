//! Error types for the account ledger
//!
//! Every failure the core can report is a variant of [`LedgerError`]. Errors
//! are returned to the immediate caller; nothing is swallowed inside the core.
//!
//! # Error Categories
//!
//! - **Lookup Errors**: unknown user, account or transaction
//! - **Validation Errors**: ownership, status, amount and cancellation rules
//! - **Concurrency Errors**: the per-account lock could not be obtained
//! - **Arithmetic/Record Errors**: overflow, exhausted numbering, duplicate records

use thiserror::Error;

/// Main error type for the account ledger
///
/// Validation variants are always detected before any state is changed, so an
/// operation that returns one of them has had no effect on the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Referenced user id has no matching record
    #[error("User {user_id} not found")]
    UserNotFound { user_id: u64 },

    /// Referenced account number has no matching record
    #[error("Account {account_number} not found")]
    AccountNotFound { account_number: String },

    /// Referenced transaction id has no matching record
    #[error("Transaction {transaction_id} not found")]
    TransactionNotFound { transaction_id: String },

    /// Creating another account would exceed the per-user cap
    #[error("User {user_id} already owns the maximum of {max} accounts")]
    MaxAccountsPerUser { user_id: u64, max: usize },

    /// Account does not belong to the acting user
    #[error("Account {account_number} is not owned by user {user_id}")]
    OwnerMismatch {
        user_id: u64,
        account_number: String,
    },

    /// Closure requested on an account that is already unregistered
    #[error("Account {account_number} is already closed")]
    AlreadyClosed { account_number: String },

    /// Balance mutation requested on an unregistered account
    #[error("Account {account_number} is closed")]
    AccountClosed { account_number: String },

    /// Closure requested on an account with a positive balance
    #[error("Account {account_number} still holds a balance of {balance}")]
    BalanceNotEmpty { account_number: String, balance: u64 },

    /// Debit amount is larger than the current balance
    #[error("Amount {requested} exceeds balance {balance} of account {account_number}")]
    AmountExceedsBalance {
        account_number: String,
        balance: u64,
        requested: u64,
    },

    /// Amount is zero, negative, malformed or outside the accepted range
    #[error("Invalid amount '{amount}'")]
    InvalidAmount { amount: String },

    /// Cancel targets a transaction that belongs to a different account
    #[error("Transaction {transaction_id} does not belong to account {account_number}")]
    TransactionAccountMismatch {
        transaction_id: String,
        account_number: String,
    },

    /// Cancel targets an entry that is not a successful use
    #[error("Transaction {transaction_id} is a {kind} entry and cannot be cancelled")]
    TransactionNotCancellable {
        transaction_id: String,
        kind: String,
    },

    /// Cancel amount differs from the original transaction amount
    #[error("Transaction {transaction_id} must be cancelled in full: original {original}, requested {requested}")]
    PartialCancelNotAllowed {
        transaction_id: String,
        original: u64,
        requested: u64,
    },

    /// Original transaction is older than the cancellation window
    #[error("Transaction {transaction_id} is too old to cancel")]
    CancelWindowExpired { transaction_id: String },

    /// Mutual exclusion could not be obtained within the wait bound
    #[error("Failed to acquire lock '{key}'")]
    LockAcquisitionFailed { key: String },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {account_number}")]
    ArithmeticOverflow {
        operation: String,
        account_number: String,
    },

    /// Every 10-digit account number has been handed out
    #[error("No account numbers left to assign")]
    AccountNumberExhausted,

    /// Account number is not exactly 10 digits
    #[error("Invalid account number '{value}'")]
    InvalidAccountNumber { value: String },

    /// A transaction with this id was already recorded
    #[error("Transaction {transaction_id} already recorded")]
    DuplicateTransaction { transaction_id: String },

    /// A user with this id is already registered
    #[error("User {user_id} already registered")]
    DuplicateUser { user_id: u64 },
}

impl LedgerError {
    /// Stable machine-readable code for logs and reports
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::UserNotFound { .. } => "USER_NOT_FOUND",
            LedgerError::AccountNotFound { .. } => "ACCOUNT_NOT_FOUND",
            LedgerError::TransactionNotFound { .. } => "TRANSACTION_NOT_FOUND",
            LedgerError::MaxAccountsPerUser { .. } => "MAX_ACCOUNTS_PER_USER",
            LedgerError::OwnerMismatch { .. } => "OWNER_MISMATCH",
            LedgerError::AlreadyClosed { .. } => "ALREADY_CLOSED",
            LedgerError::AccountClosed { .. } => "ACCOUNT_CLOSED",
            LedgerError::BalanceNotEmpty { .. } => "BALANCE_NOT_EMPTY",
            LedgerError::AmountExceedsBalance { .. } => "AMOUNT_EXCEEDS_BALANCE",
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::TransactionAccountMismatch { .. } => "TRANSACTION_ACCOUNT_MISMATCH",
            LedgerError::TransactionNotCancellable { .. } => "TRANSACTION_NOT_CANCELLABLE",
            LedgerError::PartialCancelNotAllowed { .. } => "PARTIAL_CANCEL_NOT_ALLOWED",
            LedgerError::CancelWindowExpired { .. } => "CANCEL_WINDOW_EXPIRED",
            LedgerError::LockAcquisitionFailed { .. } => "LOCK_ACQUISITION_FAILED",
            LedgerError::ArithmeticOverflow { .. } => "ARITHMETIC_OVERFLOW",
            LedgerError::AccountNumberExhausted => "ACCOUNT_NUMBER_EXHAUSTED",
            LedgerError::InvalidAccountNumber { .. } => "INVALID_ACCOUNT_NUMBER",
            LedgerError::DuplicateTransaction { .. } => "DUPLICATE_TRANSACTION",
            LedgerError::DuplicateUser { .. } => "DUPLICATE_USER",
        }
    }

    /// Whether a caller may reasonably retry the same request
    ///
    /// Only lock contention is transient; every other error is a property of
    /// the request or of the stored state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::LockAcquisitionFailed { .. })
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn user_not_found(user_id: u64) -> Self {
        LedgerError::UserNotFound { user_id }
    }

    pub fn account_not_found(account_number: impl ToString) -> Self {
        LedgerError::AccountNotFound {
            account_number: account_number.to_string(),
        }
    }

    pub fn transaction_not_found(transaction_id: impl ToString) -> Self {
        LedgerError::TransactionNotFound {
            transaction_id: transaction_id.to_string(),
        }
    }

    pub fn max_accounts_per_user(user_id: u64, max: usize) -> Self {
        LedgerError::MaxAccountsPerUser { user_id, max }
    }

    pub fn owner_mismatch(user_id: u64, account_number: impl ToString) -> Self {
        LedgerError::OwnerMismatch {
            user_id,
            account_number: account_number.to_string(),
        }
    }

    pub fn already_closed(account_number: impl ToString) -> Self {
        LedgerError::AlreadyClosed {
            account_number: account_number.to_string(),
        }
    }

    pub fn account_closed(account_number: impl ToString) -> Self {
        LedgerError::AccountClosed {
            account_number: account_number.to_string(),
        }
    }

    pub fn balance_not_empty(account_number: impl ToString, balance: u64) -> Self {
        LedgerError::BalanceNotEmpty {
            account_number: account_number.to_string(),
            balance,
        }
    }

    pub fn amount_exceeds_balance(account_number: impl ToString, balance: u64, requested: u64) -> Self {
        LedgerError::AmountExceedsBalance {
            account_number: account_number.to_string(),
            balance,
            requested,
        }
    }

    pub fn invalid_amount(amount: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    pub fn transaction_account_mismatch(
        transaction_id: impl ToString,
        account_number: impl ToString,
    ) -> Self {
        LedgerError::TransactionAccountMismatch {
            transaction_id: transaction_id.to_string(),
            account_number: account_number.to_string(),
        }
    }

    pub fn transaction_not_cancellable(transaction_id: impl ToString, kind: impl ToString) -> Self {
        LedgerError::TransactionNotCancellable {
            transaction_id: transaction_id.to_string(),
            kind: kind.to_string(),
        }
    }

    pub fn partial_cancel_not_allowed(
        transaction_id: impl ToString,
        original: u64,
        requested: u64,
    ) -> Self {
        LedgerError::PartialCancelNotAllowed {
            transaction_id: transaction_id.to_string(),
            original,
            requested,
        }
    }

    pub fn cancel_window_expired(transaction_id: impl ToString) -> Self {
        LedgerError::CancelWindowExpired {
            transaction_id: transaction_id.to_string(),
        }
    }

    pub fn lock_acquisition_failed(key: impl ToString) -> Self {
        LedgerError::LockAcquisitionFailed {
            key: key.to_string(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account_number: impl ToString) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account_number: account_number.to_string(),
        }
    }

    pub fn invalid_account_number(value: impl ToString) -> Self {
        LedgerError::InvalidAccountNumber {
            value: value.to_string(),
        }
    }

    pub fn duplicate_transaction(transaction_id: impl ToString) -> Self {
        LedgerError::DuplicateTransaction {
            transaction_id: transaction_id.to_string(),
        }
    }
}
