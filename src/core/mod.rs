//! Core ledger logic module
//!
//! This module contains the account ledger components:
//! - `traits` - Store, named mutex and clock abstractions
//! - `ledger_store` - Thread-safe in-memory store
//! - `named_mutex` - In-process named mutex service with hold leases
//! - `clock` - System and manually driven clocks
//! - `lock_coordinator` - Per-account lock discipline
//! - `account_manager` - Account lifecycle and balance mutation
//! - `engine` - Ledger recording and cancellation rules
//! - `ledger` - Façade wiring everything together

pub mod account_manager;
pub mod clock;
pub mod engine;
pub mod ledger;
pub mod ledger_store;
pub mod lock_coordinator;
pub mod named_mutex;
pub mod traits;

pub use account_manager::AccountManager;
pub use clock::{ManualClock, SystemClock};
pub use engine::{TransactionEngine, CANCEL_WINDOW_DAYS};
pub use ledger::Ledger;
pub use ledger_store::InMemoryLedgerStore;
pub use lock_coordinator::{account_lock_key, LockConfig, LockCoordinator};
pub use named_mutex::InMemoryMutexService;
pub use traits::{Clock, LedgerStore, NamedMutex};
