//! Typed remote operations over a [`Transport`].
//!
//! Every operation builds a request envelope, serializes it, sends it to one service
//! with the client's deadline, decodes the response envelope and matches on the
//! populated variant. Nothing is retried here; [`BlockRpc::wait_until_reachable`] is
//! the only loop and it is used once, before any transfer starts.

use std::time::Duration;

use block_file_transport::{Service, Transport};
use block_file_types::block_store::{
    block_store_response, BlockItem, BlockStoreRequest, BlockStoreResponse,
};
use block_file_types::chain::{
    chain_response, error_code, ChainRequest, ChainResponse, SubmitBlockResponse,
};
use block_file_types::{Block, ErrorResponse, RetryConfig};
use prost::Message;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::RpcError;

/// Deadline applied to every call unless overridden.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(600);

/// Upper bound on the deadline of a single readiness probe.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// What the archive loop needs from the chain head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    pub head_block_id: Vec<u8>,
    pub head_height: u64,
    pub last_irreversible_height: u64,
}

/// `data` payload of a chain error response.
#[derive(Debug, Deserialize)]
struct ChainErrorData {
    code: i64,
}

/// Client for the chain and block store services.
pub struct BlockRpc<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> BlockRpc<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            timeout: DEFAULT_RPC_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange<Req, Resp>(
        &self,
        service: Service,
        operation: &'static str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp, RpcError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let mut body = Vec::with_capacity(request.encoded_len());
        request
            .encode(&mut body)
            .map_err(|source| RpcError::Serialization { operation, source })?;

        let response = self
            .transport
            .call(service, body, timeout)
            .await
            .map_err(|source| RpcError::Transport { operation, source })?;

        Resp::decode(response.as_slice()).map_err(|source| RpcError::Deserialization {
            operation,
            service,
            source,
        })
    }

    /// Head topology and last irreversible block of the chain.
    pub async fn get_head_info(&self) -> Result<HeadInfo, RpcError> {
        const OP: &str = "get_head_info";

        let response: ChainResponse = self
            .exchange(Service::Chain, OP, &ChainRequest::get_head_info(), self.timeout)
            .await?;

        match response.response {
            Some(chain_response::Response::GetHeadInfo(info)) => {
                let topology = info.head_topology.ok_or(RpcError::MissingField {
                    operation: OP,
                    service: Service::Chain,
                    field: "head_topology",
                })?;
                Ok(HeadInfo {
                    head_block_id: topology.id,
                    head_height: topology.height,
                    last_irreversible_height: info.last_irreversible_block,
                })
            }
            Some(chain_response::Response::Error(error)) => Err(RpcError::Remote {
                operation: OP,
                service: Service::Chain,
                message: error.message,
            }),
            Some(_) | None => Err(RpcError::UnexpectedResponse {
                operation: OP,
                service: Service::Chain,
            }),
        }
    }

    /// Up to `max_count` blocks on the head's branch, starting at `start_height`.
    pub async fn get_blocks_by_height(
        &self,
        head_block_id: &[u8],
        start_height: u64,
        max_count: u32,
    ) -> Result<Vec<BlockItem>, RpcError> {
        const OP: &str = "get_blocks_by_height";

        let request =
            BlockStoreRequest::get_blocks_by_height(head_block_id.to_vec(), start_height, max_count);
        let response: BlockStoreResponse = self
            .exchange(Service::BlockStore, OP, &request, self.timeout)
            .await?;

        match response.response {
            Some(block_store_response::Response::GetBlocksByHeight(batch)) => {
                Ok(batch.block_items)
            }
            Some(block_store_response::Response::Error(error)) => Err(RpcError::Remote {
                operation: OP,
                service: Service::BlockStore,
                message: error.message,
            }),
            Some(_) | None => Err(RpcError::UnexpectedResponse {
                operation: OP,
                service: Service::BlockStore,
            }),
        }
    }

    /// Submit one block to the chain. The receipt is returned as-is.
    pub async fn submit_block(&self, block: Block) -> Result<SubmitBlockResponse, RpcError> {
        const OP: &str = "submit_block";

        let response: ChainResponse = self
            .exchange(Service::Chain, OP, &ChainRequest::submit_block(block), self.timeout)
            .await?;

        match response.response {
            Some(chain_response::Response::SubmitBlock(receipt)) => Ok(receipt),
            Some(chain_response::Response::Error(error)) => Err(classify_submit_error(OP, error)),
            Some(_) | None => Err(RpcError::UnexpectedResponse {
                operation: OP,
                service: Service::Chain,
            }),
        }
    }

    /// Send the reserved request to the chain. Any well-formed chain envelope,
    /// including an error, counts as an answer.
    pub async fn probe(&self, timeout: Duration) -> Result<(), RpcError> {
        let _: ChainResponse = self
            .exchange(Service::Chain, "probe", &ChainRequest::reserved(), timeout)
            .await?;
        Ok(())
    }

    pub async fn is_reachable(&self, timeout: Duration) -> bool {
        self.probe(timeout).await.is_ok()
    }

    /// Probe the chain until it answers, backing off between attempts.
    ///
    /// Returns the number of probes sent. Fails with the last probe error once
    /// `retry` allows no further attempt.
    pub async fn wait_until_reachable(&self, retry: &RetryConfig) -> Result<usize, RpcError> {
        let probe_timeout = self.timeout.min(MAX_PROBE_TIMEOUT);
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            match self.probe(probe_timeout).await {
                Ok(()) => {
                    info!(attempts, "Chain is reachable");
                    return Ok(attempts);
                }
                Err(err) => {
                    if !retry.allows(attempts) {
                        return Err(err);
                    }
                    let delay = retry.backoff_for(attempts - 1);
                    debug!(attempts, error = %err, ?delay, "chain not reachable yet");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Map a chain error response to the submit error it stands for.
///
/// Only a `data` payload that parses as `{"code": <int>}` with a known code is
/// classified; anything else stays a plain remote error.
pub fn classify_submit_error(operation: &'static str, error: ErrorResponse) -> RpcError {
    let code = serde_json::from_str::<ChainErrorData>(&error.data).map(|data| data.code);
    match code {
        Ok(error_code::UNKNOWN_PREVIOUS_BLOCK) => RpcError::UnknownPreviousBlock {
            operation,
            message: error.message,
        },
        Ok(error_code::PRE_IRREVERSIBILITY_BLOCK) => RpcError::PreIrreversibilityBlock {
            operation,
            message: error.message,
        },
        _ => RpcError::Remote {
            operation,
            service: Service::Chain,
            message: error.message,
        },
    }
}
