//! Error types for the remote operation client and the transfer loops.

use block_file_transport::{Service, TransportError};
use block_file_types::EntryError;

/// Failure of one typed remote operation.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The request envelope could not be serialized.
    #[error("{operation}: failed to serialize request: {source}")]
    Serialization {
        operation: &'static str,
        #[source]
        source: prost::EncodeError,
    },

    #[error("{operation}: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// The response bytes are not a valid response envelope.
    #[error("{operation}: failed to deserialize {service} response: {source}")]
    Deserialization {
        operation: &'static str,
        service: Service,
        #[source]
        source: prost::DecodeError,
    },

    /// The envelope decoded but carries the wrong variant (or none).
    #[error("{operation}: unexpected {service} response")]
    UnexpectedResponse {
        operation: &'static str,
        service: Service,
    },

    /// The success variant is missing a field the operation needs.
    #[error("{operation}: {service} response is missing {field}")]
    MissingField {
        operation: &'static str,
        service: Service,
        field: &'static str,
    },

    /// The service answered with its error variant.
    #[error("{operation}: {service} returned an error: {message}")]
    Remote {
        operation: &'static str,
        service: Service,
        message: String,
    },

    #[error("{operation}: unknown previous block: {message}")]
    UnknownPreviousBlock {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: block is before the last irreversible block: {message}")]
    PreIrreversibilityBlock {
        operation: &'static str,
        message: String,
    },
}

impl RpcError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Transport { source, .. } if source.is_timeout())
    }

    /// Name of the operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            RpcError::Serialization { operation, .. }
            | RpcError::Transport { operation, .. }
            | RpcError::Deserialization { operation, .. }
            | RpcError::UnexpectedResponse { operation, .. }
            | RpcError::MissingField { operation, .. }
            | RpcError::Remote { operation, .. }
            | RpcError::UnknownPreviousBlock { operation, .. }
            | RpcError::PreIrreversibilityBlock { operation, .. } => operation,
        }
    }
}

/// Fatal failure of an archive or replay run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An option value is unusable. Raised before any loop starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// An archive line could not be turned back into a block.
    #[error("block file line {line}: {source}")]
    Entry {
        line: u64,
        #[source]
        source: EntryError,
    },

    /// A block item returned by the block store carries no block.
    #[error("block store returned no block for height {height}")]
    MissingBlock { height: u64 },

    #[error("failed to write block file: {0}")]
    Write(#[source] std::io::Error),

    /// Reading kept failing on consecutive lines.
    #[error("giving up after {count} consecutive block file read errors: {source}")]
    Read {
        count: usize,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_timeout_detection() {
        let err = RpcError::Transport {
            operation: "submit_block",
            source: TransportError::Timeout {
                service: Service::Chain,
                timeout: Duration::from_secs(600),
            },
        };
        assert!(err.is_timeout());
        assert_eq!(err.operation(), "submit_block");
        assert_eq!(
            err.to_string(),
            "submit_block: chain rpc timed out after 600s"
        );

        let err = RpcError::Remote {
            operation: "get_head_info",
            service: Service::Chain,
            message: "boom".to_string(),
        };
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_rpc_error_is_transparent_in_pipeline_error() {
        let err: Error = RpcError::UnexpectedResponse {
            operation: "get_blocks_by_height",
            service: Service::BlockStore,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "get_blocks_by_height: unexpected block_store response"
        );
    }
}
