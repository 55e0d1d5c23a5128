use crate::core::LockConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay account ledger commands from CSV
#[derive(Parser, Debug)]
#[command(name = "account-ledger")]
#[command(about = "Replay account, use and cancel commands against an in-memory ledger", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing command records
    #[arg(value_name = "INPUT", help = "Path to the commands CSV file")]
    pub input_file: PathBuf,

    /// Users CSV file seeding the ledger
    #[arg(
        long = "users",
        value_name = "USERS",
        help = "Path to the users CSV file (id,name)"
    )]
    pub users_file: PathBuf,

    /// Processing strategy to use for the commands
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' for file order or 'async' for account-partitioned batches"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of concurrent partitions (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of account partitions processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// How long to wait for an account lock
    #[arg(
        long = "lock-wait-ms",
        value_name = "MS",
        default_value_t = 1000,
        help = "Milliseconds to wait for an account lock (max 5000)"
    )]
    pub lock_wait_ms: u64,

    /// How long an account lock may be held
    #[arg(
        long = "lock-hold-ms",
        value_name = "MS",
        default_value_t = 5000,
        help = "Milliseconds an account lock may be held (max 5000)"
    )]
    pub lock_hold_ms: u64,

    /// Optional file receiving every ledger entry
    #[arg(
        long = "ledger",
        value_name = "PATH",
        help = "Write every transaction entry to this CSV file"
    )]
    pub ledger_file: Option<PathBuf>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to the defaults; zero values are rejected by
    /// `BatchConfig::new` with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Lock timing from CLI arguments, validated
    pub fn to_lock_config(&self) -> Result<LockConfig, String> {
        let config = LockConfig::new(
            Duration::from_millis(self.lock_wait_ms),
            Duration::from_millis(self.lock_hold_ms),
        );
        config.validate()?;
        Ok(config)
    }
}
