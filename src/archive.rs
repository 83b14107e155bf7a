//! Archive writer loop: block store -> block file.

use std::io::Write;

use block_file_transport::Transport;
use block_file_types::encode_entry;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::rpc::BlockRpc;

/// Where the archive starts and how many blocks each fetch asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub start_height: u64,
    pub batch_size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub last_irreversible_height: u64,
    /// Start height of every fetch, in order.
    pub fetch_heights: Vec<u64>,
    pub blocks_written: u64,
    /// Cursor value when the loop stopped.
    pub next_height: u64,
}

/// Append every block from `options.start_height` up to the last irreversible
/// block to `out`, one entry per line.
///
/// Head info is read once. The cursor then advances by `batch_size` after each
/// fetch regardless of how many blocks came back, and the loop stops once it
/// reaches the last irreversible height or a fetch returns nothing.
pub async fn archive_blocks<T, W>(
    rpc: &BlockRpc<T>,
    out: &mut W,
    options: ArchiveOptions,
) -> Result<ArchiveSummary>
where
    T: Transport,
    W: Write + Send,
{
    if options.batch_size == 0 {
        return Err(Error::Config("batch size must be at least 1".to_string()));
    }
    let batch = u64::from(options.batch_size);

    let head = rpc.get_head_info().await?;
    info!(
        "Last irreversible block {} (head {} at {})",
        head.last_irreversible_height,
        hex::encode(&head.head_block_id),
        head.head_height
    );

    let mut summary = ArchiveSummary {
        last_irreversible_height: head.last_irreversible_height,
        ..Default::default()
    };
    let mut cursor = options.start_height;

    while cursor < head.last_irreversible_height {
        let stride_end = cursor.saturating_add(batch);
        info!("Fetching blocks {}-{}", cursor, stride_end);
        summary.fetch_heights.push(cursor);

        let items = rpc
            .get_blocks_by_height(&head.head_block_id, cursor, options.batch_size)
            .await?;

        let (Some(first), Some(last)) = (items.first(), items.last()) else {
            warn!(
                "No blocks returned at height {}, stopping before the last irreversible block {}",
                cursor, head.last_irreversible_height
            );
            break;
        };
        let (first_height, last_height) = (first.block_height, last.block_height);

        for item in items.iter() {
            let block = item.block.as_ref().ok_or(Error::MissingBlock {
                height: item.block_height,
            })?;
            out.write_all(encode_entry(block).as_bytes())
                .map_err(Error::Write)?;
        }
        out.flush().map_err(Error::Write)?;
        summary.blocks_written += items.len() as u64;
        info!("Saved blocks {}-{}", first_height, last_height);

        // The stride is fixed; heights a short batch did not cover are not fetched again.
        let skipped_until = (stride_end - 1).min(head.last_irreversible_height);
        if (items.len() as u64) < batch && last_height < skipped_until {
            warn!(
                "Short batch: got {} of {} blocks, heights {}-{} will not be archived",
                items.len(),
                batch,
                last_height + 1,
                skipped_until
            );
        }

        cursor = stride_end;
    }

    summary.next_height = cursor;
    info!("Block file successfully generated");
    Ok(summary)
}
