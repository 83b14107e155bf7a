//! Block store service envelopes (`koinos.rpc.block_store`).

use crate::protocol::Block;
use crate::rpc::{ErrorResponse, ReservedRpc};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBlocksByHeightRequest {
    /// Head of the fork the heights are resolved against.
    #[prost(bytes = "vec", tag = "1")]
    pub head_block_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub ancestor_start_height: u64,
    #[prost(uint32, tag = "3")]
    pub num_blocks: u32,
    #[prost(bool, tag = "4")]
    pub return_block: bool,
    #[prost(bool, tag = "5")]
    pub return_receipt: bool,
}

/// One block of a [`GetBlocksByHeightResponse`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockItem {
    #[prost(bytes = "vec", tag = "1")]
    pub block_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub block_height: u64,
    #[prost(message, optional, tag = "3")]
    pub block: Option<Block>,
    #[prost(bytes = "vec", tag = "4")]
    pub receipt: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBlocksByHeightResponse {
    #[prost(message, repeated, tag = "1")]
    pub block_items: Vec<BlockItem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockStoreRequest {
    #[prost(oneof = "block_store_request::Request", tags = "1, 3")]
    pub request: Option<block_store_request::Request>,
}

pub mod block_store_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "1")]
        Reserved(super::ReservedRpc),
        #[prost(message, tag = "3")]
        GetBlocksByHeight(super::GetBlocksByHeightRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockStoreResponse {
    #[prost(oneof = "block_store_response::Response", tags = "1, 2, 4")]
    pub response: Option<block_store_response::Response>,
}

pub mod block_store_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        Reserved(super::ReservedRpc),
        #[prost(message, tag = "2")]
        Error(super::ErrorResponse),
        #[prost(message, tag = "4")]
        GetBlocksByHeight(super::GetBlocksByHeightResponse),
    }
}

impl BlockStoreRequest {
    /// Range query for up to `num_blocks` blocks starting at `start_height`.
    ///
    /// Always asks for block bodies and never for receipts.
    pub fn get_blocks_by_height(head_block_id: Vec<u8>, start_height: u64, num_blocks: u32) -> Self {
        Self {
            request: Some(block_store_request::Request::GetBlocksByHeight(
                GetBlocksByHeightRequest {
                    head_block_id,
                    ancestor_start_height: start_height,
                    num_blocks,
                    return_block: true,
                    return_receipt: false,
                },
            )),
        }
    }
}

impl BlockStoreResponse {
    pub fn blocks(block_items: Vec<BlockItem>) -> Self {
        Self {
            response: Some(block_store_response::Response::GetBlocksByHeight(
                GetBlocksByHeightResponse { block_items },
            )),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            response: Some(block_store_response::Response::Error(ErrorResponse {
                message: message.into(),
                data: String::new(),
            })),
        }
    }
}

impl BlockItem {
    /// Wrap a block the way the block store returns it.
    pub fn from_block(block: Block) -> Self {
        Self {
            block_id: block.id.clone(),
            block_height: block.height().unwrap_or_default(),
            block: Some(block),
            receipt: Vec::new(),
        }
    }
}
