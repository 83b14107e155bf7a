//! Test utilities for transports.
//!
//! Provides an in-memory transport that answers from a closure and records every
//! call, so clients and loops can be tested without a node.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{Service, Transport, TransportError};

type Handler = dyn Fn(Service, &[u8]) -> Result<Vec<u8>, TransportError> + Send + Sync;

/// One call seen by a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub service: Service,
    pub request: Vec<u8>,
    pub timeout: Duration,
}

/// Transport whose responses come from a closure.
///
/// # Example
///
/// ```ignore
/// let transport = ScriptedTransport::new(|service, request| {
///     assert_eq!(service, Service::Chain);
///     Ok(response_bytes.clone())
/// });
/// ```
pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(Service, &[u8]) -> Result<Vec<u8>, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Transport that answers every call with the same bytes.
    pub fn replying(response: Vec<u8>) -> Self {
        Self::new(move |_, _| Ok(response.clone()))
    }

    /// Transport that fails every call with the same error.
    pub fn failing(error: TransportError) -> Self {
        Self::new(move |_, _| Err(error.clone()))
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn call(
        &self,
        service: Service,
        request: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let response = (self.handler)(service, &request);
        self.calls.lock().push(RecordedCall {
            service,
            request,
            timeout,
        });
        response
    }
}
