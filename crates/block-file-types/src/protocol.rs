//! Block schema (`koinos.protocol`).

/// Header of a block. Only `height` is interpreted by the pipeline.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockHeader {
    #[prost(bytes = "vec", tag = "1")]
    pub previous: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(uint64, tag = "3")]
    pub timestamp: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub previous_state_merkle_root: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub transaction_merkle_root: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub signer: Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "7")]
    pub approved_proposals: Vec<Vec<u8>>,
}

/// A block as produced by the chain.
///
/// `transactions` holds each serialized transaction message untouched. Embedded
/// messages and `bytes` share the same wire type, so blocks decoded here re-encode
/// to identical bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    /// Content hash (multihash) of the block.
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub header: Option<BlockHeader>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub transactions: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
}

impl Block {
    /// Height from the header, if the block has one.
    pub fn height(&self) -> Option<u64> {
        self.header.as_ref().map(|h| h.height)
    }
}

/// Position of a block in the fork tree.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockTopology {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub height: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub previous: Vec<u8>,
}
