//! Account Ledger CLI
//!
//! Replays account and balance commands from a CSV file against an in-memory
//! ledger and prints the final account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --users users.csv commands.csv > accounts.csv
//! cargo run -- --users users.csv --strategy async commands.csv > accounts.csv
//! cargo run -- --users users.csv --ledger ledger.csv commands.csv > accounts.csv
//! RUST_LOG=debug cargo run -- --users users.csv commands.csv
//! ```
//!
//! Logs go to stderr; account states go to stdout.
//!
//! # Exit Codes
//!
//! - 0: Success (rejected commands are logged, not fatal)
//! - 1: Error (bad lock timing, file not found, malformed users file, etc.)

use account_ledger::cli;
use account_ledger::strategy;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: cli::CliArgs) -> Result<(), String> {
    let lock_config = args.to_lock_config()?;
    let config = matches!(args.strategy, cli::StrategyType::Async).then(|| args.to_batch_config());
    let strategy = strategy::create_strategy(args.strategy, config, lock_config);

    let mut ledger_writer = match &args.ledger_file {
        Some(path) => Some(BufWriter::new(File::create(path).map_err(|e| {
            format!("Failed to create ledger file '{}': {}", path.display(), e)
        })?)),
        None => None,
    };

    let mut output = std::io::stdout().lock();
    strategy.process(
        &args.users_file,
        &args.input_file,
        &mut output,
        ledger_writer.as_mut().map(|w| w as &mut dyn Write),
    )?;

    if let Some(mut writer) = ledger_writer {
        writer
            .flush()
            .map_err(|e| format!("Failed to flush ledger file: {}", e))?;
    }

    Ok(())
}

fn main() {
    init_tracing();
    let args = cli::parse_args();

    if let Err(e) = run(args) {
        error!("{}", e);
        process::exit(1);
    }
}
