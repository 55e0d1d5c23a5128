//! Account balance engine
//!
//! This module provides the `AccountManager` struct which owns every rule about
//! account lifecycle and balance mutation.
//!
//! The AccountManager is responsible for:
//! - Creating accounts with monotonically assigned account numbers
//! - Closing accounts that are owned by the caller and fully drained
//! - Listing a user's accounts
//! - Debiting ("use") and crediting ("cancel") balances with validation
//!
//! Every mutation re-reads the account from the store after the relevant lock
//! has been taken, validates the fresh snapshot and only then writes it back.

use crate::core::lock_coordinator::LockCoordinator;
use crate::core::traits::{Clock, LedgerStore};
use crate::types::{
    validate_amount, Account, AccountDto, AccountInfo, AccountNumber, Amount, Balance,
    LedgerError, UserId, MAX_ACCOUNTS_PER_USER,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Manages account lifecycle and balances
///
/// Cheap to share: all collaborators are held behind `Arc`, so a single
/// manager can serve any number of threads.
pub struct AccountManager {
    store: Arc<dyn LedgerStore>,
    locks: Arc<LockCoordinator>,
    clock: Arc<dyn Clock>,
}

impl AccountManager {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        locks: Arc<LockCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AccountManager {
            store,
            locks,
            clock,
        }
    }

    /// Open a new account for a user
    ///
    /// The account number is the highest number handed out so far plus one, or
    /// `1000000000` for the very first account. Reading the highest number and
    /// saving the new account happen under the coordinator-wide creation lock.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the new account
    /// * `initial_balance` - Starting balance
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The user does not exist
    /// - The user already owns `MAX_ACCOUNTS_PER_USER` accounts
    /// - Every account number has been used
    /// - The creation lock could not be taken
    #[instrument(skip(self))]
    pub fn create_account(
        &self,
        user_id: UserId,
        initial_balance: Balance,
    ) -> Result<AccountDto, LedgerError> {
        let result = self.locks.with_creation_lock(|| {
            let user = self
                .store
                .find_user_by_id(user_id)
                .ok_or_else(|| LedgerError::user_not_found(user_id))?;

            if self.store.count_accounts_for_user(user.id) >= MAX_ACCOUNTS_PER_USER {
                return Err(LedgerError::max_accounts_per_user(
                    user.id,
                    MAX_ACCOUNTS_PER_USER,
                ));
            }

            let account_number = match self.store.find_highest_account_number() {
                Some(highest) => highest.next()?,
                None => AccountNumber::first(),
            };

            let account = Account::new(
                self.store.next_account_id(),
                user.id,
                account_number,
                initial_balance,
                self.clock.now(),
            );
            self.store.save_account(account)
        });

        match result {
            Ok(account) => {
                info!(account = %account.account_number, balance = account.balance, "Account created");
                Ok(AccountDto::from(&account))
            }
            Err(e) => {
                warn!(code = e.code(), "Account creation rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Close an account
    ///
    /// # Arguments
    ///
    /// * `user_id` - User requesting the closure; must own the account
    /// * `account_number` - Account to close
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The user or the account does not exist
    /// - The account belongs to another user
    /// - The account is already closed
    /// - The balance is not zero
    /// - The account lock could not be taken
    #[instrument(skip(self))]
    pub fn close_account(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
    ) -> Result<AccountDto, LedgerError> {
        let result = self.locks.with_account_lock(account_number, || {
            let user = self
                .store
                .find_user_by_id(user_id)
                .ok_or_else(|| LedgerError::user_not_found(user_id))?;
            let mut account = self.load_account(account_number)?;

            if !account.is_owned_by(user.id) {
                return Err(LedgerError::owner_mismatch(user.id, account_number));
            }
            if !account.is_in_use() {
                return Err(LedgerError::already_closed(account_number));
            }
            if account.balance > 0 {
                return Err(LedgerError::balance_not_empty(
                    account_number,
                    account.balance,
                ));
            }

            account.unregister(self.clock.now());
            self.store.save_account(account)
        });

        match result {
            Ok(account) => {
                info!(account = %account.account_number, "Account closed");
                Ok(AccountDto::from(&account))
            }
            Err(e) => {
                warn!(code = e.code(), "Account closure rejected: {}", e);
                Err(e)
            }
        }
    }

    /// List a user's accounts in creation order
    ///
    /// Takes no lock; balances are whatever the store holds at read time.
    /// Closed accounts are included.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user does not exist.
    pub fn list_accounts(&self, user_id: UserId) -> Result<Vec<AccountInfo>, LedgerError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .ok_or_else(|| LedgerError::user_not_found(user_id))?;

        Ok(self
            .store
            .find_accounts_for_user(user.id)
            .iter()
            .map(AccountInfo::from)
            .collect())
    }

    /// Debit an account under its lock
    ///
    /// # Arguments
    ///
    /// * `user_id` - User spending the money; must own the account
    /// * `account_number` - Account to debit
    /// * `amount` - Amount to debit
    ///
    /// # Returns
    ///
    /// The account after the debit
    ///
    /// # Errors
    ///
    /// See [`AccountManager::apply_use_locked`], plus `LockAcquisitionFailed`.
    pub fn apply_use(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<AccountDto, LedgerError> {
        self.locks
            .with_account_lock(account_number, || {
                self.apply_use_locked(user_id, account_number, amount)
            })
            .map(|account| AccountDto::from(&account))
    }

    /// Credit an account under its lock
    ///
    /// # Errors
    ///
    /// See [`AccountManager::apply_cancel_locked`], plus `LockAcquisitionFailed`.
    pub fn apply_cancel(
        &self,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<AccountDto, LedgerError> {
        self.locks
            .with_account_lock(account_number, || {
                self.apply_cancel_locked(account_number, amount)
            })
            .map(|account| AccountDto::from(&account))
    }

    /// Debit an account; the caller must already hold its lock
    ///
    /// Checks run in this order and the first failure wins: user exists,
    /// account exists, ownership, account in use, amount policy, sufficient
    /// balance. Nothing is written unless every check passes.
    ///
    /// # Errors
    ///
    /// `UserNotFound`, `AccountNotFound`, `OwnerMismatch`, `AccountClosed`,
    /// `InvalidAmount` or `AmountExceedsBalance`.
    pub(crate) fn apply_use_locked(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<Account, LedgerError> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .ok_or_else(|| LedgerError::user_not_found(user_id))?;
        let mut account = self.load_account(account_number)?;

        if !account.is_owned_by(user.id) {
            return Err(LedgerError::owner_mismatch(user.id, account_number));
        }
        if !account.is_in_use() {
            return Err(LedgerError::account_closed(account_number));
        }
        validate_amount(amount)?;

        account.use_balance(amount)?;
        self.store.save_account(account)
    }

    /// Credit an account; the caller must already hold its lock
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `InvalidAmount` or `ArithmeticOverflow`.
    pub(crate) fn apply_cancel_locked(
        &self,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<Account, LedgerError> {
        let mut account = self.load_account(account_number)?;
        validate_amount(amount)?;

        account.cancel_balance(amount)?;
        self.store.save_account(account)
    }

    fn load_account(&self, account_number: &AccountNumber) -> Result<Account, LedgerError> {
        self.store
            .find_account_by_number(account_number)
            .ok_or_else(|| LedgerError::account_not_found(account_number))
    }
}
