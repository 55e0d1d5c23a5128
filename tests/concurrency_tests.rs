//! Concurrency tests
//!
//! Drive one shared ledger from many threads and check that the named locks
//! keep balances, account numbers and ledger entries consistent.

use account_ledger::core::LockConfig;
use account_ledger::{AccountUser, Ledger, LedgerError, TransactionResultType, TransactionType};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn ledger() -> (Ledger, std::sync::Arc<account_ledger::InMemoryLedgerStore>) {
    let config = LockConfig::new(Duration::from_secs(5), Duration::from_secs(5));
    let (ledger, store) = Ledger::in_memory(config);
    ledger.register_user(AccountUser::new(1, "Pobi")).unwrap();
    ledger.register_user(AccountUser::new(2, "Piglet")).unwrap();
    (ledger, store)
}

#[test]
fn test_concurrent_uses_never_overdraw() {
    let (ledger, store) = ledger();
    let account = ledger.create_account(1, 1_000).unwrap().account_number;
    let successes = AtomicUsize::new(0);
    let rejections = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..20 {
                    match ledger.use_balance(1, &account, 10) {
                        Ok(_) => successes.fetch_add(1, Ordering::SeqCst),
                        Err(LedgerError::AmountExceedsBalance { .. }) => {
                            rejections.fetch_add(1, Ordering::SeqCst)
                        }
                        Err(e) => panic!("unexpected error: {}", e),
                    };
                }
            });
        }
    });

    assert_eq!(successes.load(Ordering::SeqCst), 100);
    assert_eq!(rejections.load(Ordering::SeqCst), 60);

    let accounts = store.all_accounts();
    assert_eq!(accounts[0].balance, 0);

    let entries = store.all_transactions();
    assert_eq!(entries.len(), 160);
    let successful = entries
        .iter()
        .filter(|tx| tx.result_type == TransactionResultType::Success)
        .count();
    assert_eq!(successful, 100);
    assert!(entries
        .iter()
        .filter(|tx| tx.result_type == TransactionResultType::Success)
        .all(|tx| tx.balance_snapshot <= 990));
}

#[test]
fn test_concurrent_creates_respect_cap_and_unique_numbers() {
    let (ledger, store) = ledger();

    let created: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..16)
            .map(|_| scope.spawn(|| ledger.create_account(1, 100)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let numbers: HashSet<_> = created
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .map(|account| account.account_number.clone())
        .collect();
    assert_eq!(numbers.len(), 10);
    assert_eq!(
        created
            .iter()
            .filter(|result| matches!(result, Err(LedgerError::MaxAccountsPerUser { .. })))
            .count(),
        6
    );

    let next = ledger.create_account(2, 0).unwrap();
    assert_eq!(next.account_number.as_str(), "1000000010");
    assert_eq!(store.all_accounts().len(), 11);
}

#[test]
fn test_accounts_progress_independently() {
    let (ledger, store) = ledger();
    let first = ledger.create_account(1, 10_000).unwrap().account_number;
    let second = ledger.create_account(2, 10_000).unwrap().account_number;

    std::thread::scope(|scope| {
        for (user, account) in [(1, &first), (2, &second)] {
            let ledger = &ledger;
            scope.spawn(move || {
                for _ in 0..50 {
                    let used = ledger.use_balance(user, account, 100).unwrap();
                    ledger
                        .cancel_balance(&used.transaction_id, account, 100)
                        .unwrap();
                }
                ledger.use_balance(user, account, 2_500).unwrap();
            });
        }
    });

    for account in store.all_accounts() {
        assert_eq!(account.balance, 7_500);
    }
    let cancels = store
        .all_transactions()
        .iter()
        .filter(|tx| tx.transaction_type == TransactionType::Cancel)
        .count();
    assert_eq!(cancels, 100);
}
