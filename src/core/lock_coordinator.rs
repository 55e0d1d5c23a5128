//! Per-account lock coordination
//!
//! The `LockCoordinator` wraps a [`NamedMutex`] provider and runs closures
//! while holding the lock for an account number. All balance-mutating
//! operations on the same account number serialize through it, whichever
//! thread or process they come from.
//!
//! # Guarantees
//!
//! - The lock key is derived from the account number, never the surrogate id
//! - If the lock cannot be taken within the wait bound the closure never runs
//!   and `LockAcquisitionFailed` is returned
//! - The lock is released on every exit path, including panics, through a
//!   guard that releases on drop
//! - No retries beyond the provider's own wait; callers decide whether to retry

use crate::core::traits::NamedMutex;
use crate::types::{AccountNumber, LedgerError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix shared by every lock key
pub const LOCK_KEY_PREFIX: &str = "ACLK:";

/// Key of the coordinator-wide lock serializing account-number allocation
pub const CREATION_LOCK_KEY: &str = "ACLK:account-creation";

/// Upper bound accepted for both the wait and the hold duration
pub const MAX_LOCK_DURATION: Duration = Duration::from_secs(5);

/// Lock timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// How long to wait to acquire a lock before giving up
    pub wait_timeout: Duration,
    /// How long a lock may be held before it is released automatically
    pub hold_timeout: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(1),
            hold_timeout: Duration::from_secs(5),
        }
    }
}

impl LockConfig {
    pub fn new(wait_timeout: Duration, hold_timeout: Duration) -> Self {
        Self {
            wait_timeout,
            hold_timeout,
        }
    }

    /// Validate the configuration
    ///
    /// Both durations must be non-zero and no longer than [`MAX_LOCK_DURATION`].
    pub fn validate(&self) -> Result<(), String> {
        if self.wait_timeout.is_zero() {
            return Err("Lock wait timeout cannot be 0".to_string());
        }
        if self.hold_timeout.is_zero() {
            return Err("Lock hold timeout cannot be 0".to_string());
        }
        if self.wait_timeout > MAX_LOCK_DURATION {
            return Err(format!(
                "Lock wait timeout cannot exceed {}ms",
                MAX_LOCK_DURATION.as_millis()
            ));
        }
        if self.hold_timeout > MAX_LOCK_DURATION {
            return Err(format!(
                "Lock hold timeout cannot exceed {}ms",
                MAX_LOCK_DURATION.as_millis()
            ));
        }
        Ok(())
    }
}

/// Lock key for an account number
pub fn account_lock_key(account_number: &AccountNumber) -> String {
    format!("{}{}", LOCK_KEY_PREFIX, account_number)
}

/// Releases the held key when dropped
struct HeldLock<'a> {
    mutex: &'a dyn NamedMutex,
    key: &'a str,
}

impl Drop for HeldLock<'_> {
    fn drop(&mut self) {
        self.mutex.release(self.key);
        debug!(key = self.key, "Lock released");
    }
}

/// Runs operations under named locks
pub struct LockCoordinator {
    mutex: Arc<dyn NamedMutex>,
    config: LockConfig,
}

impl LockCoordinator {
    pub fn new(mutex: Arc<dyn NamedMutex>, config: LockConfig) -> Self {
        Self { mutex, config }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Run `operation` while holding the lock for `account_number`
    ///
    /// # Errors
    ///
    /// Returns `LockAcquisitionFailed` if the lock could not be taken within
    /// the wait bound, otherwise whatever `operation` returns.
    pub fn with_account_lock<R, F>(
        &self,
        account_number: &AccountNumber,
        operation: F,
    ) -> Result<R, LedgerError>
    where
        F: FnOnce() -> Result<R, LedgerError>,
    {
        let key = account_lock_key(account_number);
        self.with_lock(&key, operation)
    }

    /// Run `operation` while holding the coordinator-wide creation lock
    pub fn with_creation_lock<R, F>(&self, operation: F) -> Result<R, LedgerError>
    where
        F: FnOnce() -> Result<R, LedgerError>,
    {
        self.with_lock(CREATION_LOCK_KEY, operation)
    }

    fn with_lock<R, F>(&self, key: &str, operation: F) -> Result<R, LedgerError>
    where
        F: FnOnce() -> Result<R, LedgerError>,
    {
        if !self
            .mutex
            .try_acquire(key, self.config.wait_timeout, self.config.hold_timeout)
        {
            warn!(
                key,
                wait_ms = self.config.wait_timeout.as_millis() as u64,
                "Lock acquisition timed out"
            );
            return Err(LedgerError::lock_acquisition_failed(key));
        }
        debug!(key, "Lock acquired");

        let _held = HeldLock {
            mutex: self.mutex.as_ref(),
            key,
        };
        operation()
    }
}
