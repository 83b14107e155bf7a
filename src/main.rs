//! `koinos-block-file` binary: archive blocks from a node or replay them into one.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use koinos_block_file::args::Args;
use koinos_block_file::config::RunConfig;
use koinos_block_file::logging::init_logging;
use koinos_block_file::runner::{run, RunOutcome};
use tracing::{error, info};

/// How long blocking requests still in flight may delay exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version go to stdout and are not failures.
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let config = match RunConfig::from_args(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = config.create_dirs() {
        eprintln!("Error: {}", err);
        return ExitCode::FAILURE;
    }

    let _guard = match init_logging(config.log_level, &config.log_file()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let outcome = runtime.block_on(run(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    match outcome {
        Ok(RunOutcome::Completed) => {
            info!("Done");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Interrupted) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
