//! In-memory ledger store
//!
//! This module provides `InMemoryLedgerStore`, a thread-safe [`LedgerStore`]
//! backed by `DashMap`. It holds users, accounts keyed by account number and
//! ledger entries keyed by transaction id.
//!
//! # Append-Only Ledger
//!
//! Ledger entries are inserted once. A second insert under an existing
//! transaction id is rejected, and there is no update or delete path. Each
//! entry is stamped with an append sequence number so snapshots have a total
//! order even when timestamps collide.
//!
//! # Thread Safety
//!
//! DashMap shards its locks internally, so lookups and writes for different
//! accounts do not block each other. The store does not serialize
//! read-modify-write sequences; that is the lock coordinator's job.

use crate::core::traits::LedgerStore;
use crate::types::{
    Account, AccountId, AccountNumber, AccountUser, LedgerError, Transaction, TransactionId,
    UserId,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe in-memory ledger store
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    users: DashMap<UserId, AccountUser>,
    accounts: DashMap<AccountNumber, Account>,
    /// Entries keyed by id, paired with their append sequence number
    transactions: DashMap<TransactionId, (u64, Transaction)>,
    account_sequence: AtomicU64,
    transaction_sequence: AtomicU64,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all accounts, sorted by account number
    pub fn all_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.account_number.cmp(&b.account_number));
        accounts
    }

    /// Snapshot of all ledger entries, ordered by time and then append order
    pub fn all_transactions(&self) -> Vec<Transaction> {
        let mut transactions: Vec<(u64, Transaction)> = self
            .transactions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        transactions.sort_by(|(a_seq, a), (b_seq, b)| {
            a.transaction_at
                .cmp(&b.transaction_at)
                .then_with(|| a_seq.cmp(b_seq))
        });
        transactions.into_iter().map(|(_, tx)| tx).collect()
    }

    /// Ledger entries recorded against one account
    pub fn transactions_for_account(&self, account_number: &AccountNumber) -> Vec<Transaction> {
        self.all_transactions()
            .into_iter()
            .filter(|tx| &tx.account_number == account_number)
            .collect()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn save_user(&self, user: AccountUser) -> Result<AccountUser, LedgerError> {
        match self.users.entry(user.id) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateUser { user_id: user.id }),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    fn find_user_by_id(&self, user_id: UserId) -> Option<AccountUser> {
        self.users.get(&user_id).map(|user| user.clone())
    }

    fn find_account_by_number(&self, account_number: &AccountNumber) -> Option<Account> {
        self.accounts
            .get(account_number)
            .map(|account| account.clone())
    }

    fn find_highest_account_number(&self) -> Option<AccountNumber> {
        self.accounts
            .iter()
            .map(|entry| entry.key().clone())
            .max()
    }

    fn count_accounts_for_user(&self, user_id: UserId) -> usize {
        self.accounts
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .count()
    }

    fn find_accounts_for_user(&self, user_id: UserId) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    fn next_account_id(&self) -> AccountId {
        self.account_sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn save_account(&self, account: Account) -> Result<Account, LedgerError> {
        self.accounts
            .insert(account.account_number.clone(), account.clone());
        Ok(account)
    }

    fn find_transaction_by_id(&self, transaction_id: &TransactionId) -> Option<Transaction> {
        self.transactions
            .get(transaction_id)
            .map(|entry| entry.value().1.clone())
    }

    fn save_transaction(&self, transaction: Transaction) -> Result<Transaction, LedgerError> {
        match self.transactions.entry(transaction.transaction_id.clone()) {
            Entry::Occupied(_) => Err(LedgerError::duplicate_transaction(
                &transaction.transaction_id,
            )),
            Entry::Vacant(slot) => {
                let sequence = self.transaction_sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert((sequence, transaction.clone()));
                Ok(transaction)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TransactionResultType, TransactionType};
    use chrono::Utc;

    fn account(store: &InMemoryLedgerStore, user_id: UserId, number: &str) -> Account {
        Account::new(
            store.next_account_id(),
            user_id,
            number.parse().unwrap(),
            0,
            Utc::now(),
        )
    }

    fn transaction(id: &str, number: &str, amount: u64) -> Transaction {
        Transaction {
            transaction_id: TransactionId::from(id),
            account_id: 1,
            account_number: number.parse().unwrap(),
            transaction_type: TransactionType::Use,
            result_type: TransactionResultType::Success,
            amount,
            balance_snapshot: 0,
            transaction_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_lookup() {
        let store = InMemoryLedgerStore::new();
        store.save_user(AccountUser::new(1, "Pobi")).unwrap();

        assert_eq!(store.find_user_by_id(1).unwrap().name, "Pobi");
        assert!(store.find_user_by_id(2).is_none());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let store = InMemoryLedgerStore::new();
        store.save_user(AccountUser::new(1, "Pobi")).unwrap();

        let result = store.save_user(AccountUser::new(1, "Other"));

        assert_eq!(result, Err(LedgerError::DuplicateUser { user_id: 1 }));
        assert_eq!(store.find_user_by_id(1).unwrap().name, "Pobi");
    }

    #[test]
    fn test_highest_account_number() {
        let store = InMemoryLedgerStore::new();
        assert!(store.find_highest_account_number().is_none());

        store.save_account(account(&store, 1, "1000000012")).unwrap();
        store.save_account(account(&store, 1, "1000000003")).unwrap();

        assert_eq!(
            store.find_highest_account_number().unwrap().as_str(),
            "1000000012"
        );
    }

    #[test]
    fn test_accounts_for_user_in_creation_order() {
        let store = InMemoryLedgerStore::new();
        store.save_account(account(&store, 1, "1000000005")).unwrap();
        store.save_account(account(&store, 2, "1000000001")).unwrap();
        store.save_account(account(&store, 1, "1000000002")).unwrap();

        let numbers: Vec<String> = store
            .find_accounts_for_user(1)
            .iter()
            .map(|a| a.account_number.to_string())
            .collect();

        assert_eq!(numbers, vec!["1000000005", "1000000002"]);
        assert_eq!(store.count_accounts_for_user(1), 2);
        assert_eq!(store.count_accounts_for_user(3), 0);
    }

    #[test]
    fn test_save_account_replaces_by_number() {
        let store = InMemoryLedgerStore::new();
        let mut saved = store.save_account(account(&store, 1, "1000000000")).unwrap();

        saved.balance = 500;
        store.save_account(saved.clone()).unwrap();

        let number: AccountNumber = "1000000000".parse().unwrap();
        assert_eq!(store.find_account_by_number(&number).unwrap().balance, 500);
        assert_eq!(store.count_accounts_for_user(1), 1);
    }

    #[test]
    fn test_transactions_are_append_only() {
        let store = InMemoryLedgerStore::new();
        store
            .save_transaction(transaction("tx1", "1000000000", 100))
            .unwrap();

        let result = store.save_transaction(transaction("tx1", "1000000000", 999));

        assert!(matches!(
            result.unwrap_err(),
            LedgerError::DuplicateTransaction { .. }
        ));
        let stored = store
            .find_transaction_by_id(&TransactionId::from("tx1"))
            .unwrap();
        assert_eq!(stored.amount, 100);
    }

    #[test]
    fn test_transactions_for_account() {
        let store = InMemoryLedgerStore::new();
        store
            .save_transaction(transaction("tx1", "1000000000", 100))
            .unwrap();
        store
            .save_transaction(transaction("tx2", "1000000001", 200))
            .unwrap();

        let number: AccountNumber = "1000000001".parse().unwrap();
        let entries = store.transactions_for_account(&number);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, 200);
    }

    #[test]
    fn test_same_instant_entries_keep_append_order() {
        let store = InMemoryLedgerStore::new();
        let at = Utc::now();
        let ids = ["tx9", "tx3", "tx7", "tx1", "tx5"];
        for id in ids {
            let mut tx = transaction(id, "1000000000", 100);
            tx.transaction_at = at;
            store.save_transaction(tx).unwrap();
        }

        let ordered: Vec<String> = store
            .all_transactions()
            .iter()
            .map(|tx| tx.transaction_id.to_string())
            .collect();

        assert_eq!(ordered, ids);
    }

    #[test]
    fn test_account_ids_are_sequential() {
        let store = InMemoryLedgerStore::new();
        assert_eq!(store.next_account_id(), 1);
        assert_eq!(store.next_account_id(), 2);
    }
}
