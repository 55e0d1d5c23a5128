//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. It processes commands in batches using thread-based
//! parallelism with account-based partitioning.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (account partitioning + threading)
//!     └── CommandExecutor (shared ledger)
//!         ├── LockCoordinator (per-account and creation locks)
//!         └── InMemoryLedgerStore (DashMap-backed state)
//! ```
//!
//! # Thread-Based Parallelism
//!
//! - Batches are processed one after another, so an account's commands keep
//!   their file order across the whole input
//! - Within a batch, `create` rows run first and in file order, so account
//!   numbers are allocated exactly as the sync strategy allocates them
//! - The remaining rows are partitioned by account and the partitions run in
//!   parallel on blocking worker threads, bounded by `max_concurrent_batches`

use crate::core::LockConfig;
use crate::io::async_reader::AsyncReader;
use crate::strategy::{CommandExecutor, ProcessingStrategy};
use crate::types::{AccountNumber, CommandRecord, CommandType};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Configuration for batch processing
///
/// Controls how commands are batched and the number of worker threads
/// for parallel processing within each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Maximum number of account partitions processing concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                "Invalid batch_size ({}), using default ({})",
                batch_size, default.batch_size
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                "Invalid max_concurrent_batches ({}), using default ({})",
                max_concurrent_batches, default.max_concurrent_batches
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Batch processor with account-based partitioning
///
/// Runs the rows of one batch against a shared executor. Rows touching
/// different accounts run concurrently; rows touching the same account run
/// sequentially in file order.
#[derive(Clone)]
pub struct BatchProcessor {
    executor: Arc<CommandExecutor>,
    permits: Arc<Semaphore>,
}

impl BatchProcessor {
    pub fn new(executor: Arc<CommandExecutor>, max_concurrent: usize) -> Self {
        Self {
            executor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Partition a batch of commands by account number
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one sub-batch
    /// - Commands for each account maintain their original order
    /// - Commands without an account share the `None` sub-batch
    pub fn partition_by_account(
        &self,
        batch: Vec<CommandRecord>,
    ) -> HashMap<Option<AccountNumber>, Vec<CommandRecord>> {
        let mut account_batches: HashMap<Option<AccountNumber>, Vec<CommandRecord>> =
            HashMap::new();

        for record in batch {
            account_batches
                .entry(record.account.clone())
                .or_default()
                .push(record);
        }

        account_batches
    }

    /// Process a batch and return the number of rejected commands
    pub async fn process_batch(&self, batch: Vec<CommandRecord>) -> usize {
        let (creates, rest): (Vec<_>, Vec<_>) = batch
            .into_iter()
            .partition(|record| record.command == CommandType::Create);

        let mut rejected = 0;
        if !creates.is_empty() {
            rejected += self.run_sequential(creates).await;
        }

        let account_batches = self.partition_by_account(rest);
        debug!(partitions = account_batches.len(), "Partitioned batch");

        let tasks = account_batches
            .into_values()
            .map(|commands| self.run_sequential(commands));

        rejected + futures::future::join_all(tasks).await.into_iter().sum::<usize>()
    }

    /// Run commands one after another on a blocking worker thread
    async fn run_sequential(&self, commands: Vec<CommandRecord>) -> usize {
        let count = commands.len();
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Worker pool closed: {}", e);
                return count;
            }
        };

        let executor = Arc::clone(&self.executor);
        let task = tokio::task::spawn_blocking(move || {
            commands
                .iter()
                .filter(|command| executor.execute(command).is_err())
                .count()
        });

        match task.await {
            Ok(rejected) => rejected,
            Err(e) => {
                error!("Task panicked: {:?}", e);
                count
            }
        }
    }
}

/// Asynchronous batch processing strategy
///
/// Implements the ProcessingStrategy trait using multi-threaded, asynchronous
/// batch processing. Commands are read in batches and processed sequentially
/// (batch-by-batch) to maintain ordering guarantees. Within each batch, commands
/// are partitioned by account and processed in parallel across multiple threads.
///
/// # Thread Safety
///
/// The ledger behind the shared `CommandExecutor` takes a named lock per
/// account, so partitions never interleave on the same balance.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    /// Batch processing configuration
    config: BatchConfig,
    lock_config: LockConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, lock_config: LockConfig) -> Self {
        Self {
            config,
            lock_config,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process commands from the input file and write results to output
    ///
    /// 1. Seeds a shared ledger from the users file
    /// 2. Creates a tokio multi-threaded runtime
    /// 3. Reads commands in batches from CSV using AsyncReader
    /// 4. Processes each batch fully before reading the next
    /// 5. Writes the final account states (and ledger entries, if requested)
    fn process(
        &self,
        users_path: &Path,
        input_path: &Path,
        output: &mut dyn Write,
        ledger_output: Option<&mut dyn Write>,
    ) -> Result<(), String> {
        let executor = Arc::new(CommandExecutor::new(users_path, self.lock_config)?);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        runtime.block_on(async {
            let processor =
                BatchProcessor::new(Arc::clone(&executor), self.config.max_concurrent_batches);

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads through the futures-io traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut processed = 0usize;
            let mut rejected = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                processed += batch.len();
                rejected += processor.process_batch(batch).await;
            }
            info!(processed, rejected, "Finished processing commands");

            Ok::<(), String>(())
        })?;

        executor.write_results(output, ledger_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(config: BatchConfig, commands: &str) -> Result<String, String> {
        let users = create_temp_csv("id,name\n1,Pobi\n2,Piglet\n");
        let commands = create_temp_csv(commands);
        let strategy = AsyncProcessingStrategy::new(config, LockConfig::default());
        let mut output = Vec::new();

        strategy.process(users.path(), commands.path(), &mut output, None)?;

        Ok(String::from_utf8(output).unwrap())
    }

    fn record(command: CommandType, account: Option<&str>) -> CommandRecord {
        CommandRecord {
            command,
            user: Some(1),
            account: account.map(|a| a.parse().unwrap()),
            amount: Some(100),
            reference: None,
        }
    }

    #[test]
    fn test_batch_config_zero_values_fall_back() {
        let config = BatchConfig::new(0, 0);

        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.max_concurrent_batches, num_cpus::get());
    }

    #[test]
    fn test_partition_by_account_keeps_order() {
        let users = create_temp_csv("id,name\n1,Pobi\n");
        let executor = Arc::new(CommandExecutor::new(users.path(), LockConfig::default()).unwrap());
        let processor = BatchProcessor::new(executor, 2);

        let batch = vec![
            record(CommandType::Use, Some("1000000000")),
            record(CommandType::Use, Some("1000000001")),
            record(CommandType::Close, Some("1000000000")),
            record(CommandType::Use, None),
        ];

        let partitions = processor.partition_by_account(batch);

        assert_eq!(partitions.len(), 3);
        let first_key: Option<AccountNumber> = Some("1000000000".parse().unwrap());
        let no_account: Option<AccountNumber> = None;
        let first = &partitions[&first_key];
        assert_eq!(
            first.iter().map(|r| r.command).collect::<Vec<_>>(),
            vec![CommandType::Use, CommandType::Close]
        );
        assert_eq!(partitions[&no_account].len(), 1);
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let users = create_temp_csv("id,name\n1,Pobi\n");
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), LockConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(users.path(), Path::new("nonexistent.csv"), &mut output, None);

        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[rstest]
    #[case::single_batch(BatchConfig::default())]
    #[case::tiny_batches(BatchConfig::new(2, 4))]
    #[case::one_row_per_batch(BatchConfig::new(1, 1))]
    fn test_async_strategy_maintains_ordering_across_batches(#[case] config: BatchConfig) {
        let output = run(
            config,
            "op,user,account,amount,ref\n\
             create,1,,1000,\n\
             create,2,,500,\n\
             use,1,1000000000,300,a\n\
             use,2,1000000001,200,\n\
             use,1,1000000000,200,\n\
             cancel,,1000000000,300,a\n\
             use,2,1000000001,300,\n\
             close,2,1000000001,,\n",
        )
        .unwrap();

        assert_eq!(
            output,
            "account,user,status,balance\n\
             1000000000,1,IN_USE,800\n\
             1000000001,2,UNREGISTERED,0\n"
        );
    }

    /// A `use` ahead of its account's `create` in the same batch sees the
    /// account, because creates run first; across batches file order holds
    #[rstest]
    #[case::same_batch(BatchConfig::new(10, 2), "1000000000,1,IN_USE,900")]
    #[case::separate_batches(BatchConfig::new(1, 2), "1000000000,1,IN_USE,1000")]
    fn test_async_strategy_runs_creates_first_within_batch(
        #[case] config: BatchConfig,
        #[case] expected_row: &str,
    ) {
        let commands = "op,user,account,amount,ref\n\
                        use,1,1000000000,100,\n\
                        create,1,,1000,\n";

        let async_output = run(config, commands).unwrap();

        assert_eq!(
            async_output,
            format!("account,user,status,balance\n{}\n", expected_row)
        );
    }

    #[test]
    fn test_sync_strategy_rejects_use_before_create() {
        let users = create_temp_csv("id,name\n1,Pobi\n");
        let commands = create_temp_csv(
            "op,user,account,amount,ref\nuse,1,1000000000,100,\ncreate,1,,1000,\n",
        );
        let mut output = Vec::new();

        crate::strategy::SyncProcessingStrategy::default()
            .process(users.path(), commands.path(), &mut output, None)
            .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,user,status,balance\n1000000000,1,IN_USE,1000\n"
        );
    }

    #[test]
    fn test_async_strategy_allocates_numbers_in_file_order() {
        let output = run(
            BatchConfig::new(3, 4),
            "op,user,account,amount,ref\n\
             create,2,,20,\n\
             create,1,,10,\n\
             create,2,,30,\n\
             create,1,,40,\n",
        )
        .unwrap();

        assert_eq!(
            output,
            "account,user,status,balance\n\
             1000000000,2,IN_USE,20\n\
             1000000001,1,IN_USE,10\n\
             1000000002,2,IN_USE,30\n\
             1000000003,1,IN_USE,40\n"
        );
    }
}
