//! Chain service envelopes (`koinos.rpc.chain`).
//!
//! Only the variants the block file tool speaks are declared. A response carrying a
//! variant not listed here decodes with `response: None`, which callers treat as an
//! unexpected response.

use crate::protocol::{Block, BlockTopology};
use crate::rpc::{ErrorResponse, ReservedRpc};

/// Well-known chain error codes found in the `code` field of [`ErrorResponse::data`].
pub mod error_code {
    /// The submitted block's parent is not known to the chain.
    pub const UNKNOWN_PREVIOUS_BLOCK: i64 = -107;
    /// The submitted block is at or below the last irreversible block.
    pub const PRE_IRREVERSIBILITY_BLOCK: i64 = -114;
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetHeadInfoRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetHeadInfoResponse {
    #[prost(message, optional, tag = "1")]
    pub head_topology: Option<BlockTopology>,
    #[prost(uint64, tag = "2")]
    pub last_irreversible_block: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub head_state_merkle_root: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub head_block_time: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitBlockRequest {
    #[prost(message, optional, tag = "1")]
    pub block: Option<Block>,
}

/// Response to a block submission. The receipt is kept as opaque bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SubmitBlockResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub receipt: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChainRequest {
    #[prost(oneof = "chain_request::Request", tags = "1, 2, 4")]
    pub request: Option<chain_request::Request>,
}

pub mod chain_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "1")]
        Reserved(super::ReservedRpc),
        #[prost(message, tag = "2")]
        SubmitBlock(super::SubmitBlockRequest),
        #[prost(message, tag = "4")]
        GetHeadInfo(super::GetHeadInfoRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChainResponse {
    #[prost(oneof = "chain_response::Response", tags = "1, 2, 3, 5")]
    pub response: Option<chain_response::Response>,
}

pub mod chain_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        Reserved(super::ReservedRpc),
        #[prost(message, tag = "2")]
        Error(super::ErrorResponse),
        #[prost(message, tag = "3")]
        SubmitBlock(super::SubmitBlockResponse),
        #[prost(message, tag = "5")]
        GetHeadInfo(super::GetHeadInfoResponse),
    }
}

impl ChainRequest {
    pub fn reserved() -> Self {
        Self {
            request: Some(chain_request::Request::Reserved(ReservedRpc {})),
        }
    }

    pub fn get_head_info() -> Self {
        Self {
            request: Some(chain_request::Request::GetHeadInfo(GetHeadInfoRequest {})),
        }
    }

    pub fn submit_block(block: Block) -> Self {
        Self {
            request: Some(chain_request::Request::SubmitBlock(SubmitBlockRequest {
                block: Some(block),
            })),
        }
    }
}

impl ChainResponse {
    pub fn error(message: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            response: Some(chain_response::Response::Error(ErrorResponse {
                message: message.into(),
                data: data.into(),
            })),
        }
    }
}
