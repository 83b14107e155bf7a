//! Shared types for the koinos-block-file workspace.
//!
//! This crate holds everything that describes data on the wire or on disk, so the
//! transport crate and the pipeline can agree on it without depending on each other:
//!
//! - [`protocol`]: the block schema ([`Block`], [`BlockHeader`], [`BlockTopology`])
//! - [`chain`]: request/response envelopes of the chain service
//! - [`block_store`]: request/response envelopes of the block store service
//! - [`rpc`]: messages shared by every service (reserved probe, error response)
//! - [`encoding`]: the archive entry codec (one base64 line per block)
//!
//! The messages are declared with `prost` derives and are wire compatible with the
//! node's protobuf schema. Fields the pipeline never looks at (transactions,
//! receipts) are carried as opaque embedded-message bytes so that decoding and
//! re-encoding a block is lossless.

pub mod block_store;
pub mod chain;
pub mod encoding;
pub mod protocol;
pub mod rpc;

pub use encoding::{decode_entry, encode_entry, EntryError};
pub use protocol::{Block, BlockHeader, BlockTopology};
pub use rpc::{ErrorResponse, ReservedRpc};

use std::time::Duration;

/// Configuration for retry behavior on network operations.
///
/// The pipeline itself never retries; this only drives the startup readiness gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of attempts. `0` means keep trying until success.
    pub retries: usize,
    /// Initial backoff duration between attempts.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
}

impl RetryConfig {
    /// Create a new RetryConfig with the specified parameters.
    pub fn new(retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// Delay to wait after the given failed attempt (0-based), doubling each time.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let shift = attempt.min(31) as u32;
        self.initial_backoff
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows(&self, attempts: usize) -> bool {
        self.retries == 0 || attempts < self.retries
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 30,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_millis(5000),
        }
    }
}
