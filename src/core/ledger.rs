//! Ledger façade
//!
//! `Ledger` wires a store, a named mutex provider and a clock into an
//! `AccountManager` and a `TransactionEngine`, and exposes the operations
//! callers use. Balance mutations go through the always-record path, so every
//! rejected use or cancel against an existing account leaves a failure entry.

use crate::core::account_manager::AccountManager;
use crate::core::clock::SystemClock;
use crate::core::engine::TransactionEngine;
use crate::core::ledger_store::InMemoryLedgerStore;
use crate::core::lock_coordinator::{LockConfig, LockCoordinator};
use crate::core::named_mutex::InMemoryMutexService;
use crate::core::traits::{Clock, LedgerStore, NamedMutex};
use crate::types::{
    AccountDto, AccountInfo, AccountNumber, AccountUser, Amount, Balance, LedgerError, TransactionDto,
    TransactionId, UserId,
};
use std::sync::Arc;

/// Account ledger
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    accounts: Arc<AccountManager>,
    engine: TransactionEngine,
}

impl Ledger {
    /// Build a ledger from its collaborators
    pub fn new(
        store: Arc<dyn LedgerStore>,
        mutex: Arc<dyn NamedMutex>,
        clock: Arc<dyn Clock>,
        lock_config: LockConfig,
    ) -> Self {
        let locks = Arc::new(LockCoordinator::new(mutex, lock_config));
        let accounts = Arc::new(AccountManager::new(
            store.clone(),
            locks.clone(),
            clock.clone(),
        ));
        let engine = TransactionEngine::new(store.clone(), accounts.clone(), locks, clock);

        Ledger {
            store,
            accounts,
            engine,
        }
    }

    /// Build a ledger on the in-memory store and mutex service
    ///
    /// # Returns
    ///
    /// The ledger together with its store, for reading back the final state.
    pub fn in_memory(lock_config: LockConfig) -> (Self, Arc<InMemoryLedgerStore>) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = Ledger::new(
            store.clone(),
            Arc::new(InMemoryMutexService::new()),
            Arc::new(SystemClock),
            lock_config,
        );
        (ledger, store)
    }

    /// Seed a user
    ///
    /// # Errors
    ///
    /// Returns `DuplicateUser` if the id is already taken.
    pub fn register_user(&self, user: AccountUser) -> Result<AccountUser, LedgerError> {
        self.store.save_user(user)
    }

    pub fn create_account(
        &self,
        user_id: UserId,
        initial_balance: Balance,
    ) -> Result<AccountDto, LedgerError> {
        self.accounts.create_account(user_id, initial_balance)
    }

    pub fn close_account(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
    ) -> Result<AccountDto, LedgerError> {
        self.accounts.close_account(user_id, account_number)
    }

    pub fn list_accounts(&self, user_id: UserId) -> Result<Vec<AccountInfo>, LedgerError> {
        self.accounts.list_accounts(user_id)
    }

    /// Debit an account; a rejected attempt is recorded as a failure
    pub fn use_balance(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        self.engine.use_balance(user_id, account_number, amount)
    }

    /// Reverse an earlier use; a rejected attempt is recorded as a failure
    pub fn cancel_balance(
        &self,
        transaction_id: &TransactionId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        self.engine
            .cancel_balance(transaction_id, account_number, amount)
    }

    pub fn query_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionDto, LedgerError> {
        self.engine.query_transaction(transaction_id)
    }

    /// Balance engine, for callers driving the primitive operations
    pub fn accounts(&self) -> &AccountManager {
        &self.accounts
    }

    /// Ledger engine, for callers driving the primitive operations
    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }
}
