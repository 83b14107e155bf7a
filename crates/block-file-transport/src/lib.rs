//! Block File Transport Layer
//!
//! Request/response transports used to reach the node's RPC services.
//!
//! This crate provides:
//! - [`Transport`]: the single capability every transport implements: send a
//!   serialized request envelope to a named [`Service`] and get the serialized
//!   response back, within a deadline
//! - [`http`]: direct request/response over HTTP (`POST <endpoint>/<service>`)
//! - [`amqp`]: queue-based request/response correlated by message id
//! - [`test_utils`]: a scripted in-memory transport for tests
//!
//! Transports never retry. A call ends in exactly one of three ways: response
//! bytes, [`TransportError::Timeout`], or another [`TransportError`].
//!
//! # Example
//!
//! ```ignore
//! use block_file_transport::{http::HttpTransport, Service, Transport};
//!
//! let transport = HttpTransport::new("http://localhost:8080/");
//! let response = transport
//!     .call(Service::Chain, request_bytes, Duration::from_secs(600))
//!     .await?;
//! ```

pub mod amqp;
pub mod http;
pub mod test_utils;

pub use amqp::AmqpTransport;
pub use http::HttpTransport;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Remote services the block file tool talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Chain service: head info, block submission, reachability probe.
    Chain,
    /// Block store service: block ranges.
    BlockStore,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Chain => "chain",
            Service::BlockStore => "block_store",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single transport call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The deadline passed before a response arrived.
    #[error("{service} rpc timed out after {timeout:?}")]
    Timeout { service: Service, timeout: Duration },

    /// The request could not be delivered or the response could not be read.
    #[error("{service} rpc failed: {message}")]
    Failure { service: Service, message: String },

    /// The transport could not be set up.
    #[error("could not connect to {endpoint}: {message}")]
    Connection { endpoint: String, message: String },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

/// Send a request envelope to a service and wait for the response envelope.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs (`http`, `amqp`, ...).
    fn name(&self) -> &'static str;

    async fn call(
        &self,
        service: Service,
        request: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn call(
        &self,
        service: Service,
        request: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).call(service, request, timeout).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn call(
        &self,
        service: Service,
        request: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).call(service, request, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(Service::Chain.to_string(), "chain");
        assert_eq!(Service::BlockStore.to_string(), "block_store");
    }

    #[test]
    fn test_error_messages() {
        let err = TransportError::Timeout {
            service: Service::Chain,
            timeout: Duration::from_secs(600),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "chain rpc timed out after 600s");

        let err = TransportError::Failure {
            service: Service::BlockStore,
            message: "connection refused".to_string(),
        };
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("block_store"));
    }
}
