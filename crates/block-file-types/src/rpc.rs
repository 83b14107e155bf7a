//! Messages shared by every RPC service (`koinos.rpc`).

/// Reserved request/response, used as a no-op connectivity probe.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ReservedRpc {}

/// Error reported by a remote service.
///
/// `data` is free-form text; the chain service puts a JSON object with a numeric
/// `code` in it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(string, tag = "1")]
    pub message: String,
    #[prost(string, tag = "2")]
    pub data: String,
}
