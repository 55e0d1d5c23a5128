//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait. Commands run strictly in file order.
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Command execution to `CommandExecutor` (ledger operations)
//! - CSV output to the `csv_format` writers
//!
//! # Memory Efficiency
//!
//! Command rows are streamed one at a time; memory grows with the number of
//! accounts and ledger entries, not with the size of the input file.

use crate::core::LockConfig;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{CommandExecutor, ProcessingStrategy};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use account_ledger::core::LockConfig;
/// use account_ledger::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LockConfig::default());
/// let mut output = io::stdout();
///
/// strategy
///     .process(Path::new("users.csv"), Path::new("commands.csv"), &mut output, None)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy {
    lock_config: LockConfig,
}

impl SyncProcessingStrategy {
    pub fn new(lock_config: LockConfig) -> Self {
        Self { lock_config }
    }
}

impl Default for SyncProcessingStrategy {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Process commands in file order and write results to output
    ///
    /// 1. Seeds a ledger from the users file
    /// 2. Streams command rows through a SyncReader
    /// 3. Executes each row, logging rejected rows and continuing
    /// 4. Writes the final account states (and ledger entries, if requested)
    fn process(
        &self,
        users_path: &Path,
        input_path: &Path,
        output: &mut dyn Write,
        ledger_output: Option<&mut dyn Write>,
    ) -> Result<(), String> {
        let executor = CommandExecutor::new(users_path, self.lock_config)?;
        let reader = SyncReader::new(input_path)?;

        let mut processed = 0usize;
        let mut rejected = 0usize;
        for result in reader {
            match result {
                Ok(command) => {
                    processed += 1;
                    // The executor has already logged the rejection
                    if executor.execute(&command).is_err() {
                        rejected += 1;
                    }
                }
                Err(e) => {
                    warn!("Skipping command: {}", e);
                }
            }
        }
        info!(processed, rejected, "Finished processing commands");

        executor.write_results(output, ledger_output)
    }
}
