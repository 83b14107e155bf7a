//! Direct request/response transport over HTTP.
//!
//! Each call is a blocking `POST <endpoint>/<service>` carrying the serialized
//! request envelope as `application/octet-stream`; the response body is the
//! serialized response envelope. The blocking request runs on tokio's blocking
//! pool so the async caller is never stalled on socket I/O.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::{Service, Transport, TransportError};

const OCTET_STREAM: &str = "application/octet-stream";

/// HTTP transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    /// Base URL, without trailing slash
    endpoint: String,
    /// HTTP client for requests
    agent: ureq::Agent,
}

/// Why a blocking request failed, before it is tied to a service.
#[derive(Debug)]
enum HttpFailure {
    TimedOut,
    Other(String),
}

impl HttpTransport {
    /// Create a transport for the given endpoint (e.g. `http://localhost:8080/`).
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL of the sub-resource serving `service`.
    pub fn service_url(&self, service: Service) -> String {
        format!("{}/{}", self.endpoint, service)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn call(
        &self,
        service: Service,
        request: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let agent = self.agent.clone();
        let url = self.service_url(service);
        trace!(%url, bytes = request.len(), "http rpc request");

        let result = tokio::task::spawn_blocking(move || post(&agent, &url, &request, timeout))
            .await
            .map_err(|e| TransportError::Failure {
                service,
                message: format!("http worker failed: {e}"),
            })?;

        result.map_err(|failure| match failure {
            HttpFailure::TimedOut => TransportError::Timeout { service, timeout },
            HttpFailure::Other(message) => TransportError::Failure { service, message },
        })
    }
}

fn post(
    agent: &ureq::Agent,
    url: &str,
    body: &[u8],
    timeout: Duration,
) -> Result<Vec<u8>, HttpFailure> {
    let response = agent
        .post(url)
        .set("Content-Type", OCTET_STREAM)
        .timeout(timeout)
        .send_bytes(body)
        .map_err(|e| match e {
            ureq::Error::Status(code, response) => HttpFailure::Other(format!(
                "{} returned HTTP {} {}",
                url,
                code,
                response.status_text()
            )),
            ureq::Error::Transport(transport) if is_timeout(&transport) => HttpFailure::TimedOut,
            ureq::Error::Transport(transport) => {
                HttpFailure::Other(format!("{} unreachable: {}", url, transport))
            }
        })?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| {
            if is_timeout_io(&e) {
                HttpFailure::TimedOut
            } else {
                HttpFailure::Other(format!("failed to read response body: {}", e))
            }
        })?;

    Ok(bytes)
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    use std::error::Error;

    transport.kind() == ureq::ErrorKind::Io
        && transport
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
            .is_some_and(is_timeout_io)
}

fn is_timeout_io(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}
