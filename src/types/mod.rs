//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Users, accounts, account numbers and their projections
//! - `transaction`: Ledger entries, identifiers, amount policy and command records
//! - `error`: Error types for the account ledger

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{
    Account, AccountDto, AccountId, AccountInfo, AccountNumber, AccountStatus, AccountUser,
    Balance, UserId, MAX_ACCOUNTS_PER_USER,
};
pub use error::LedgerError;
pub use transaction::{
    validate_amount, Amount, CommandRecord, CommandType, Transaction, TransactionDto,
    TransactionId, TransactionResultType, TransactionType, MAX_TRANSACTION_AMOUNT,
    MIN_TRANSACTION_AMOUNT,
};
