//! Archive entry codec.
//!
//! A block file is a sequence of lines, each one the standard (padded) base64 form
//! of one serialized [`Block`], terminated by `\n`. There is no header, footer,
//! index or checksum.

use base64::Engine;
use prost::Message;

use crate::protocol::Block;

const ENGINE: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// Failure to turn an archive line back into a block.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("invalid base64 in block file entry: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid block in block file entry: {0}")]
    Block(#[from] prost::DecodeError),
    #[error("block file entry has no block header")]
    MissingHeader,
}

/// Encode a block as one archive line, including the trailing newline.
pub fn encode_entry(block: &Block) -> String {
    let mut line = ENGINE.encode(block.encode_to_vec());
    line.push('\n');
    line
}

/// Decode one archive line. A trailing `\n` or `\r\n` is ignored.
///
/// The block must carry a header, since its height decides what happens to it.
pub fn decode_entry(line: &[u8]) -> Result<Block, EntryError> {
    let data = ENGINE.decode(trim_line_ending(line))?;
    let block = Block::decode(data.as_slice())?;
    if block.header.is_none() {
        return Err(EntryError::MissingHeader);
    }
    Ok(block)
}

/// Strip a single trailing `\n` and an optional `\r` before it.
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
