//! Transaction ledger engine
//!
//! This module provides the `TransactionEngine` that records every attempted
//! balance mutation as an immutable ledger entry, coordinating between the
//! `AccountManager`, the `LockCoordinator` and the ledger store.
//!
//! The engine enforces business rules such as:
//! - One lock acquisition covers validation, mutation and recording
//! - Cancellation must target a transaction of the same account, in full,
//!   within the cancellation window
//! - Successful entries carry the post-mutation balance, failed entries carry
//!   the balance at attempt time
//!
//! Two recording flows are offered. The primitive operations (`record_use`,
//! `record_failed_use`, `record_cancel`, `record_failed_cancel`) leave it to the
//! caller to write a failure entry after a rejected attempt. `use_balance` and
//! `cancel_balance` write the failure entry themselves, inside the same
//! critical section as the attempt.

use crate::core::account_manager::AccountManager;
use crate::core::lock_coordinator::LockCoordinator;
use crate::core::traits::{Clock, LedgerStore};
use crate::types::{
    Account, AccountNumber, Amount, LedgerError, Transaction, TransactionDto, TransactionId,
    TransactionResultType, TransactionType, UserId,
};
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Age at which a transaction can no longer be cancelled
pub const CANCEL_WINDOW_DAYS: i64 = 365;

/// Transaction ledger engine
///
/// Orchestrates balance mutations and ledger recording. Shares its store, lock
/// coordinator and clock with the `AccountManager` it drives.
pub struct TransactionEngine {
    store: Arc<dyn LedgerStore>,
    accounts: Arc<AccountManager>,
    locks: Arc<LockCoordinator>,
    clock: Arc<dyn Clock>,
}

impl TransactionEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        accounts: Arc<AccountManager>,
        locks: Arc<LockCoordinator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        TransactionEngine {
            store,
            accounts,
            locks,
            clock,
        }
    }

    /// Debit an account and record a successful use
    ///
    /// Runs under the account lock. On a validation failure nothing is
    /// written; callers wanting an audit entry follow up with
    /// [`TransactionEngine::record_failed_use`].
    ///
    /// # Arguments
    ///
    /// * `user_id` - User spending the money
    /// * `account_number` - Account to debit
    /// * `amount` - Amount to debit
    ///
    /// # Returns
    ///
    /// The `USE`/`SUCCESS` entry, with the post-debit balance as snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The user or account does not exist
    /// - The account belongs to another user or is closed
    /// - The amount is out of range or exceeds the balance
    /// - The account lock could not be taken
    #[instrument(skip(self))]
    pub fn record_use(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        self.locks
            .with_account_lock(account_number, || self.use_locked(user_id, account_number, amount))
            .map(|tx| TransactionDto::from(&tx))
    }

    /// Record a failed use without touching the balance
    ///
    /// Performs no validation beyond resolving the account and takes no lock.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub fn record_failed_use(
        &self,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        let account = self.load_account(account_number)?;
        self.append(&account, TransactionType::Use, TransactionResultType::Fail, amount)
            .map(|tx| TransactionDto::from(&tx))
    }

    /// Reverse an earlier transaction and record a successful cancel
    ///
    /// Runs under the account lock. On a validation failure nothing is
    /// written; callers wanting an audit entry follow up with
    /// [`TransactionEngine::record_failed_cancel`].
    ///
    /// # Arguments
    ///
    /// * `transaction_id` - Transaction being reversed
    /// * `account_number` - Account the transaction was recorded against
    /// * `amount` - Must equal the original amount
    ///
    /// # Returns
    ///
    /// The `CANCEL`/`SUCCESS` entry, with the post-credit balance as snapshot
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The transaction or account does not exist
    /// - The transaction belongs to a different account
    /// - The amount differs from the original amount
    /// - The transaction is `CANCEL_WINDOW_DAYS` days old or older
    /// - The credit would overflow the balance
    /// - The account lock could not be taken
    #[instrument(skip(self))]
    pub fn record_cancel(
        &self,
        transaction_id: &TransactionId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        self.locks
            .with_account_lock(account_number, || {
                self.cancel_locked(transaction_id, account_number, amount)
            })
            .map(|tx| TransactionDto::from(&tx))
    }

    /// Record a failed cancel without touching the balance
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account does not exist.
    #[instrument(skip(self))]
    pub fn record_failed_cancel(
        &self,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        let account = self.load_account(account_number)?;
        self.append(&account, TransactionType::Cancel, TransactionResultType::Fail, amount)
            .map(|tx| TransactionDto::from(&tx))
    }

    /// Debit an account, recording the outcome either way
    ///
    /// Holds the account lock for the attempt and the recording. When the
    /// attempt is rejected and the account exists, a `USE`/`FAIL` entry is
    /// written before the original error is returned. If the lock cannot be
    /// taken nothing is written.
    ///
    /// # Errors
    ///
    /// Same as [`TransactionEngine::record_use`].
    #[instrument(skip(self))]
    pub fn use_balance(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        self.locks
            .with_account_lock(account_number, || {
                self.use_locked(user_id, account_number, amount)
                    .inspect_err(|_| {
                        self.record_failure(account_number, TransactionType::Use, amount)
                    })
            })
            .map(|tx| TransactionDto::from(&tx))
    }

    /// Reverse an earlier transaction, recording the outcome either way
    ///
    /// The failure entry is written against `account_number` whenever that
    /// account exists, whichever check rejected the cancel.
    ///
    /// # Errors
    ///
    /// Same as [`TransactionEngine::record_cancel`].
    #[instrument(skip(self))]
    pub fn cancel_balance(
        &self,
        transaction_id: &TransactionId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<TransactionDto, LedgerError> {
        self.locks
            .with_account_lock(account_number, || {
                self.cancel_locked(transaction_id, account_number, amount)
                    .inspect_err(|_| {
                        self.record_failure(account_number, TransactionType::Cancel, amount)
                    })
            })
            .map(|tx| TransactionDto::from(&tx))
    }

    /// Look up a ledger entry
    ///
    /// Takes no lock.
    ///
    /// # Errors
    ///
    /// Returns `TransactionNotFound` if no entry has this id.
    pub fn query_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionDto, LedgerError> {
        self.store
            .find_transaction_by_id(transaction_id)
            .map(|tx| TransactionDto::from(&tx))
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))
    }

    fn use_locked(
        &self,
        user_id: UserId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        let account = self
            .accounts
            .apply_use_locked(user_id, account_number, amount)?;
        let tx = self.append(
            &account,
            TransactionType::Use,
            TransactionResultType::Success,
            amount,
        )?;

        info!(
            account = %account_number,
            transaction_id = %tx.transaction_id,
            amount,
            balance = account.balance,
            "Balance used"
        );
        Ok(tx)
    }

    fn cancel_locked(
        &self,
        transaction_id: &TransactionId,
        account_number: &AccountNumber,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        let original = self
            .store
            .find_transaction_by_id(transaction_id)
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;
        let account = self.load_account(account_number)?;

        self.validate_cancel(&original, &account, amount)?;

        let account = self.accounts.apply_cancel_locked(account_number, amount)?;
        let tx = self.append(
            &account,
            TransactionType::Cancel,
            TransactionResultType::Success,
            amount,
        )?;

        info!(
            account = %account_number,
            transaction_id = %tx.transaction_id,
            cancelled = %transaction_id,
            amount,
            balance = account.balance,
            "Balance cancelled"
        );
        Ok(tx)
    }

    fn validate_cancel(
        &self,
        original: &Transaction,
        account: &Account,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if original.account_id != account.id {
            return Err(LedgerError::transaction_account_mismatch(
                &original.transaction_id,
                &account.account_number,
            ));
        }
        if original.transaction_type != TransactionType::Use
            || original.result_type != TransactionResultType::Success
        {
            return Err(LedgerError::transaction_not_cancellable(
                &original.transaction_id,
                format!("{}/{}", original.transaction_type, original.result_type),
            ));
        }
        if original.amount != amount {
            return Err(LedgerError::partial_cancel_not_allowed(
                &original.transaction_id,
                original.amount,
                amount,
            ));
        }
        if self.clock.now() - original.transaction_at >= Duration::days(CANCEL_WINDOW_DAYS) {
            return Err(LedgerError::cancel_window_expired(&original.transaction_id));
        }
        Ok(())
    }

    /// Write a failure entry for a rejected attempt, if the account resolves
    fn record_failure(
        &self,
        account_number: &AccountNumber,
        transaction_type: TransactionType,
        amount: Amount,
    ) {
        let Some(account) = self.store.find_account_by_number(account_number) else {
            warn!(account = %account_number, "Attempt rejected for unknown account; nothing recorded");
            return;
        };

        match self.append(&account, transaction_type, TransactionResultType::Fail, amount) {
            Ok(tx) => warn!(
                account = %account_number,
                transaction_id = %tx.transaction_id,
                kind = %transaction_type,
                amount,
                "Attempt rejected; failure recorded"
            ),
            Err(e) => warn!(
                account = %account_number,
                code = e.code(),
                "Attempt rejected; failure entry could not be written: {}",
                e
            ),
        }
    }

    fn append(
        &self,
        account: &Account,
        transaction_type: TransactionType,
        result_type: TransactionResultType,
        amount: Amount,
    ) -> Result<Transaction, LedgerError> {
        self.store.save_transaction(Transaction {
            transaction_id: TransactionId::generate(),
            account_id: account.id,
            account_number: account.account_number.clone(),
            transaction_type,
            result_type,
            amount,
            balance_snapshot: account.balance,
            transaction_at: self.clock.now(),
        })
    }

    fn load_account(&self, account_number: &AccountNumber) -> Result<Account, LedgerError> {
        self.store
            .find_account_by_number(account_number)
            .ok_or_else(|| LedgerError::account_not_found(account_number))
    }
}
