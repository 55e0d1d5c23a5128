//! In-process named mutex service
//!
//! Implements [`NamedMutex`] with a table of leases guarded by a
//! `parking_lot` mutex. Waiters park on a condition variable and wake either
//! when a holder releases or when the lease they are blocked on expires.
//!
//! # Lease Semantics
//!
//! - A lease is owned by the thread that acquired it; `release` from any other
//!   thread is ignored.
//! - A lease whose hold time has elapsed is treated as free and may be taken
//!   over by the next acquirer.
//! - Leases are not reentrant: a thread asking again for a key it already
//!   holds waits like any other caller.

use crate::core::traits::NamedMutex;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug)]
struct Lease {
    owner: ThreadId,
    expires_at: Instant,
}

/// Named mutex service for a single process
#[derive(Debug, Default)]
pub struct InMemoryMutexService {
    leases: Mutex<HashMap<String, Lease>>,
    released: Condvar,
}

impl InMemoryMutexService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held by an unexpired lease
    pub fn is_locked(&self, key: &str) -> bool {
        self.leases
            .lock()
            .get(key)
            .is_some_and(|lease| lease.expires_at > Instant::now())
    }
}

impl NamedMutex for InMemoryMutexService {
    fn try_acquire(&self, key: &str, wait: Duration, hold: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let owner = thread::current().id();
        let mut leases = self.leases.lock();

        loop {
            let now = Instant::now();
            let blocked_until = match leases.get(key) {
                Some(lease) if lease.expires_at > now => Some(lease.expires_at),
                Some(lease) => {
                    warn!(key, owner = ?lease.owner, "Reclaiming expired lease");
                    None
                }
                None => None,
            };

            match blocked_until {
                None => {
                    leases.insert(
                        key.to_string(),
                        Lease {
                            owner,
                            expires_at: now + hold,
                        },
                    );
                    return true;
                }
                Some(_) if now >= deadline => return false,
                Some(expires_at) => {
                    // Wake at the earlier of lease expiry and our own deadline;
                    // a release notifies before either
                    let _ = self
                        .released
                        .wait_until(&mut leases, expires_at.min(deadline));
                }
            }
        }
    }

    fn release(&self, key: &str) {
        let mut leases = self.leases.lock();
        let owner = thread::current().id();

        match leases.get(key) {
            Some(lease) if lease.owner == owner => {
                leases.remove(key);
                self.released.notify_all();
            }
            Some(lease) => {
                debug!(key, holder = ?lease.owner, "Release ignored: lease held by another thread");
            }
            None => {
                debug!(key, "Release ignored: no lease held");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_millis(50);
    const HOLD: Duration = Duration::from_secs(5);

    #[test]
    fn test_acquire_and_release() {
        let service = InMemoryMutexService::new();

        assert!(service.try_acquire("ACLK:1000000000", WAIT, HOLD));
        assert!(service.is_locked("ACLK:1000000000"));

        service.release("ACLK:1000000000");
        assert!(!service.is_locked("ACLK:1000000000"));
    }

    #[test]
    fn test_different_keys_do_not_contend() {
        let service = InMemoryMutexService::new();

        assert!(service.try_acquire("ACLK:1000000000", WAIT, HOLD));
        assert!(service.try_acquire("ACLK:1000000001", WAIT, HOLD));
    }

    #[test]
    fn test_second_acquirer_times_out() {
        let service = Arc::new(InMemoryMutexService::new());
        assert!(service.try_acquire("ACLK:1000000000", WAIT, HOLD));

        let contender = Arc::clone(&service);
        let acquired = thread::spawn(move || contender.try_acquire("ACLK:1000000000", WAIT, HOLD))
            .join()
            .unwrap();

        assert!(!acquired);
    }

    #[test]
    fn test_waiter_wakes_on_release() {
        let service = Arc::new(InMemoryMutexService::new());
        assert!(service.try_acquire("ACLK:1000000000", WAIT, HOLD));

        let contender = Arc::clone(&service);
        let waiter = thread::spawn(move || {
            contender.try_acquire("ACLK:1000000000", Duration::from_secs(5), HOLD)
        });

        thread::sleep(Duration::from_millis(20));
        service.release("ACLK:1000000000");

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_expired_lease_is_reclaimed() {
        let service = Arc::new(InMemoryMutexService::new());
        assert!(service.try_acquire("ACLK:1000000000", WAIT, Duration::from_millis(10)));

        let contender = Arc::clone(&service);
        let acquired = thread::spawn(move || {
            contender.try_acquire("ACLK:1000000000", Duration::from_millis(500), HOLD)
        })
        .join()
        .unwrap();

        assert!(acquired);
    }

    #[test]
    fn test_release_from_other_thread_is_ignored() {
        let service = Arc::new(InMemoryMutexService::new());
        assert!(service.try_acquire("ACLK:1000000000", WAIT, HOLD));

        let other = Arc::clone(&service);
        thread::spawn(move || other.release("ACLK:1000000000"))
            .join()
            .unwrap();

        assert!(service.is_locked("ACLK:1000000000"));
    }
}
