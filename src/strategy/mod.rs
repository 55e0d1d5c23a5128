//! Processing strategy module for batch command processing
//!
//! This module defines the Strategy pattern for complete batch pipelines,
//! encompassing CSV parsing, command execution against the ledger and output.
//! This allows different processing implementations (synchronous, asynchronous
//! partitioned) to be selected at runtime.

use crate::cli::StrategyType;
use crate::core::LockConfig;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod executor;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use executor::CommandExecutor;
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete batch pipelines
///
/// Each strategy seeds a fresh ledger from the users file, executes every
/// command row, and writes the final account states to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Process commands from the input file and write results to output
    ///
    /// # Arguments
    ///
    /// * `users_path` - Path to the users CSV file (`id,name`)
    /// * `input_path` - Path to the commands CSV file
    /// * `output` - Writer receiving the final account states
    /// * `ledger_output` - Optional writer receiving every ledger entry
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all processing completed (possibly with rejected commands)
    /// * `Err(String)` if a fatal error occurred (file not found, I/O error, etc.)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The users or commands file cannot be opened
    /// - The users file is malformed
    /// - Output cannot be written
    ///
    /// Individual command failures are logged and do not cause this method to
    /// return an error. Processing continues with the next command.
    fn process(
        &self,
        users_path: &Path,
        input_path: &Path,
        output: &mut dyn Write,
        ledger_output: Option<&mut dyn Write>,
    ) -> Result<(), String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async processing (ignored for sync)
/// * `lock_config` - Lock timing used by the ledger
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    lock_config: LockConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(lock_config)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, lock_config))
        }
    }
}
