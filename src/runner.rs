//! Process wiring: open the block file, pick the transport, run the selected loop
//! on a worker task and wait for a termination signal.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};

use anyhow::{anyhow, Context, Result};
use block_file_transport::{AmqpTransport, HttpTransport, Transport};
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use crate::archive::{archive_blocks, ArchiveOptions, ArchiveSummary};
use crate::args::{Method, Mode};
use crate::config::RunConfig;
use crate::error::Error;
use crate::replay::{replay_blocks, ReplaySummary};
use crate::rpc::BlockRpc;

/// How a run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The loop finished and `--exit-on-completion` was set.
    Completed,
    /// A termination signal arrived, before or after the loop finished.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSummary {
    Archive(ArchiveSummary),
    Replay(ReplaySummary),
}

type DynRpc = BlockRpc<Box<dyn Transport>>;

/// Run one archive or replay session.
pub async fn run(config: RunConfig) -> Result<RunOutcome> {
    let span = tracing::info_span!("app", app_id = %config.app_id());
    run_inner(config).instrument(span).await
}

async fn run_inner(config: RunConfig) -> Result<RunOutcome> {
    log_options(&config);

    let file = open_block_file(&config)?;
    let rpc = connect(&config).await?;

    let mut worker = spawn_worker(&config, rpc, file);

    tokio::select! {
        joined = &mut worker => {
            let summary = joined.map_err(|e| anyhow!("worker task failed: {}", e))??;
            log_summary(&summary);
            if config.exit_on_completion {
                return Ok(RunOutcome::Completed);
            }
            shutdown_signal().await.context("failed to listen for signals")?;
            info!("Shutting down");
            Ok(RunOutcome::Interrupted)
        }
        signal = shutdown_signal() => {
            signal.context("failed to listen for signals")?;
            info!("Shutting down");
            worker.abort();
            Ok(RunOutcome::Interrupted)
        }
    }
}

fn log_options(config: &RunConfig) {
    info!("Starting with options:");
    info!("  basedir: {}", config.base_dir.display());
    info!("  mode: {}", config.mode.as_str());
    info!("  method: {}", config.method.as_str());
    info!("  amqp: {}", config.amqp_url);
    info!("  rpc: {}", config.rpc_url);
    info!("  start-block-height: {}", config.start_height);
    info!("  nb-blocks-per-call: {}", config.batch_size);
    info!("  block-file-path: {}", config.block_file.display());
    info!("  instance-id: {}", config.instance_id);
    info!("  log-level: {}", config.log_level.as_str());
    info!("  rpc-timeout: {:?}", config.rpc_timeout);
    info!(
        "  connect-retries: {} (backoff {:?}..{:?})",
        config.retry.retries, config.retry.initial_backoff, config.retry.max_backoff
    );
    info!("  exit-on-completion: {}", config.exit_on_completion);
}

fn open_block_file(config: &RunConfig) -> Result<File> {
    let path = &config.block_file;
    let file = match config.mode {
        Mode::Archive => OpenOptions::new().create(true).append(true).open(path),
        Mode::Replay => File::open(path),
    };
    file.with_context(|| format!("failed to open block file {}", path.display()))
}

async fn connect(config: &RunConfig) -> Result<DynRpc> {
    let transport: Box<dyn Transport> = match config.method {
        Method::Http => Box::new(HttpTransport::new(&config.rpc_url)),
        Method::Amqp => Box::new(AmqpTransport::connect(&config.amqp_url).await?),
    };
    info!("Using {} transport", transport.name());
    let rpc = BlockRpc::new(transport).with_timeout(config.rpc_timeout);

    if config.method == Method::Amqp {
        info!("Attempting to connect to chain");
        rpc.wait_until_reachable(&config.retry)
            .await
            .context("chain is not reachable")?;
        info!("Connected");
    }
    Ok(rpc)
}

/// The worker owns the transport and the file; both are released when it ends.
fn spawn_worker(
    config: &RunConfig,
    rpc: DynRpc,
    file: File,
) -> JoinHandle<Result<TransferSummary, Error>> {
    let mode = config.mode;
    let start_height = config.start_height;
    let batch_size = config.batch_size;

    let work = async move {
        match mode {
            Mode::Archive => {
                let mut out = BufWriter::new(file);
                let options = ArchiveOptions {
                    start_height,
                    batch_size,
                };
                let summary = archive_blocks(&rpc, &mut out, options).await?;
                out.flush().map_err(Error::Write)?;
                Ok(TransferSummary::Archive(summary))
            }
            Mode::Replay => {
                let mut input = BufReader::new(file);
                let summary = replay_blocks(&rpc, &mut input, start_height).await?;
                Ok(TransferSummary::Replay(summary))
            }
        }
    };
    tokio::spawn(work.in_current_span())
}

fn log_summary(summary: &TransferSummary) {
    match summary {
        TransferSummary::Archive(s) => info!(
            fetches = s.fetch_heights.len(),
            blocks = s.blocks_written,
            last_irreversible = s.last_irreversible_height,
            "Archive finished"
        ),
        TransferSummary::Replay(s) => info!(
            applied = s.applied.len(),
            skipped = s.skipped,
            read_errors = s.read_errors,
            "Replay finished"
        ),
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
