//! Replay reader loop: block file -> chain.

use std::io::{BufRead, ErrorKind};

use block_file_transport::Transport;
use block_file_types::{decode_entry, EntryError};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::rpc::BlockRpc;

/// Consecutive failed reads after which the file is considered unreadable.
pub const MAX_CONSECUTIVE_READ_ERRORS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Entries decoded from the file.
    pub entries: u64,
    /// Heights submitted to the chain, in file order.
    pub applied: Vec<u64>,
    pub skipped: u64,
    pub read_errors: u64,
}

/// Submit every entry of `input` whose height is at least `start_height`, in file
/// order. Entries below it are skipped without a remote call.
///
/// A failed read is logged and reading resumes where it stopped, so a line
/// interrupted by an error is still decoded whole. Decoding and submission errors
/// end the run.
pub async fn replay_blocks<T, R>(
    rpc: &BlockRpc<T>,
    input: &mut R,
    start_height: u64,
) -> Result<ReplaySummary>
where
    T: Transport,
    R: BufRead + Send,
{
    let mut summary = ReplaySummary::default();
    let mut consecutive_errors = 0usize;
    let mut line = Vec::new();

    loop {
        // A failed read keeps what it already appended; the next read completes the line.
        match input.read_until(b'\n', &mut line) {
            Ok(0) if line.is_empty() => break,
            Ok(_) => consecutive_errors = 0,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                consecutive_errors += 1;
                summary.read_errors += 1;
                error!("Failed to read block file: {}", err);
                if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    return Err(Error::Read {
                        count: consecutive_errors,
                        source: err,
                    });
                }
                continue;
            }
        }

        let text = std::mem::take(&mut line);
        summary.entries += 1;
        let entry = summary.entries;
        let block = decode_entry(&text).map_err(|source| Error::Entry {
            line: entry,
            source,
        })?;
        let height = block.height().ok_or(Error::Entry {
            line: entry,
            source: EntryError::MissingHeader,
        })?;

        if height < start_height {
            info!("Skipped block {}", height);
            summary.skipped += 1;
            continue;
        }

        rpc.submit_block(block).await?;
        info!("Applied block {}", height);
        summary.applied.push(height);
    }

    info!("Block file successfully processed");
    Ok(summary)
}
