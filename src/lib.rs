//! Koinos Block File
//!
//! Moves blocks between a Koinos node and a flat block file:
//!
//! - **Archive**: read blocks from the block store up to the last irreversible
//!   block and append them to the file, one base64 entry per line
//! - **Replay**: read the file back and submit every block at or above a start
//!   height to the chain
//!
//! Both loops run against [`rpc::BlockRpc`], which speaks to the node through any
//! [`block_file_transport::Transport`] (HTTP or AMQP).

pub mod archive;
pub mod args;
pub mod config;
pub mod error;
pub mod logging;
pub mod replay;
pub mod rpc;
pub mod runner;

pub use error::{Error, RpcError};
