//! Command execution shared by the processing strategies
//!
//! `CommandExecutor` owns the ledger a batch run works against. It seeds users
//! from the users file, maps each command row onto a ledger operation, keeps
//! the `ref` labels of successful uses so later cancels can name them, and
//! writes the final account and ledger CSVs.

use crate::core::{InMemoryLedgerStore, Ledger, LockConfig};
use crate::io::csv_format::{write_accounts_csv, write_transactions_csv};
use crate::io::sync_reader::load_users;
use crate::types::{AccountNumber, CommandRecord, CommandType, LedgerError, TransactionId};
use dashmap::DashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Executes command records against an in-memory ledger
pub struct CommandExecutor {
    ledger: Ledger,
    store: Arc<InMemoryLedgerStore>,
    /// `ref` label of a use → id of the transaction it produced
    references: DashMap<String, TransactionId>,
}

impl CommandExecutor {
    /// Create an executor with a fresh ledger seeded from the users file
    ///
    /// # Errors
    ///
    /// Returns an error if the users file cannot be read or lists an id twice.
    pub fn new(users_path: &Path, lock_config: LockConfig) -> Result<Self, String> {
        let (ledger, store) = Ledger::in_memory(lock_config);

        for user in load_users(users_path)? {
            ledger
                .register_user(user)
                .map_err(|e| format!("Failed to register user: {}", e))?;
        }

        Ok(Self {
            ledger,
            store,
            references: DashMap::new(),
        })
    }

    /// Execute one command
    ///
    /// # Errors
    ///
    /// Returns a message carrying the ledger error code if the ledger rejected
    /// the command. Rejected uses and cancels have already been recorded as
    /// failures by the ledger at that point.
    pub fn execute(&self, command: &CommandRecord) -> Result<(), String> {
        let result = match command.command {
            CommandType::Create => {
                let user = required(command.user, command.command, "user")?;
                self.ledger
                    .create_account(user, command.amount.unwrap_or(0))
                    .map(|account| {
                        debug!(account = %account.account_number, user, "Created account");
                    })
            }
            CommandType::Close => {
                let user = required(command.user, command.command, "user")?;
                let account = required(command.account.as_ref(), command.command, "account")?;
                self.ledger.close_account(user, account).map(|_| ())
            }
            CommandType::Use => {
                let user = required(command.user, command.command, "user")?;
                let account = required(command.account.as_ref(), command.command, "account")?;
                let amount = required(command.amount, command.command, "amount")?;
                self.ledger.use_balance(user, account, amount).map(|tx| {
                    if let Some(label) = &command.reference {
                        self.references.insert(label.clone(), tx.transaction_id);
                    }
                })
            }
            CommandType::Cancel => {
                let account = required(command.account.as_ref(), command.command, "account")?;
                let amount = required(command.amount, command.command, "amount")?;
                let label = required(command.reference.as_deref(), command.command, "ref")?;
                let transaction_id = self.resolve_reference(label);
                self.ledger
                    .cancel_balance(&transaction_id, account, amount)
                    .map(|_| ())
            }
        };

        result.map_err(|e| describe(command, &e))
    }

    /// Transaction id a `ref` label stands for
    ///
    /// Labels that were never bound are taken to be raw transaction ids.
    fn resolve_reference(&self, label: &str) -> TransactionId {
        self.references
            .get(label)
            .map(|id| id.clone())
            .unwrap_or_else(|| TransactionId::from(label))
    }

    pub fn store(&self) -> &InMemoryLedgerStore {
        &self.store
    }

    /// Write the final account states, and the ledger entries if requested
    pub fn write_results(
        &self,
        output: &mut dyn Write,
        ledger_output: Option<&mut dyn Write>,
    ) -> Result<(), String> {
        write_accounts_csv(&self.store.all_accounts(), output)?;

        if let Some(ledger_output) = ledger_output {
            write_transactions_csv(&self.store.all_transactions(), ledger_output)?;
        }

        Ok(())
    }
}

fn required<T>(value: Option<T>, command: CommandType, field: &str) -> Result<T, String> {
    value.ok_or_else(|| format!("{:?} command is missing '{}'", command, field))
}

fn describe(command: &CommandRecord, error: &LedgerError) -> String {
    let account = command
        .account
        .as_ref()
        .map(AccountNumber::to_string)
        .unwrap_or_else(|| "-".to_string());
    warn!(
        op = ?command.command,
        account = %account,
        code = error.code(),
        "Command rejected: {}",
        error
    );
    format!("{:?} on account {} failed [{}]: {}", command.command, account, error.code(), error)
}
