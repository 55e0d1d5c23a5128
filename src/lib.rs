//! Account Ledger Library
//! # Overview
//!
//! This library keeps per-user accounts with a balance, applies "use" debits
//! and "cancel" credits under per-account named locks, and records every
//! attempt, successful or not, in an append-only transaction ledger.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (users, accounts, transactions, errors)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::named_mutex`] - Named lease-based mutex service
//!   - [`core::lock_coordinator`] - Per-account and account-creation locking
//!   - [`core::account_manager`] - Account lifecycle and balance mutation
//!   - [`core::engine`] - Use/cancel validation and ledger recording
//!   - [`core::ledger`] - Façade wiring the above together
//! - [`io`] - CSV reading and writing
//! - [`strategy`] - Batch drivers replaying command files
//!
//! # Accounts
//!
//! - A user may own at most ten accounts, closed ones included
//! - Account numbers are ten digits, allocated sequentially from `1000000000`
//! - An account can only be closed by its owner once its balance is zero
//!
//! # Transactions
//!
//! - **Use**: debit an open account owned by the caller
//! - **Cancel**: credit back the full amount of an earlier use, on the same
//!   account, within a year of that use

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{AccountManager, InMemoryLedgerStore, Ledger, LockConfig, TransactionEngine};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountNumber, AccountStatus, AccountUser, LedgerError, Transaction, TransactionId,
    TransactionResultType, TransactionType,
};
