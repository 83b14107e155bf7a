//! Queue-based request/response transport over AMQP.
//!
//! # Architecture
//!
//! Requests go to the RPC exchange with routing key `koinos.rpc.<service>`, so the
//! service name selects the queue the node's service consumes from. Replies come
//! back on a private exclusive queue named in `reply_to`:
//!
//! 1. `call` registers a fresh correlation id in the pending table
//! 2. the request is published with that id, `reply_to` and an expiration equal to
//!    the call's deadline
//! 3. one background consumer reads the reply queue and hands each reply to the
//!    caller waiting on the same correlation id
//! 4. if the deadline passes first, the id is removed and a late reply is dropped

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::{Service, Transport, TransportError};

/// Exchange the node's services bind their RPC queues to.
pub const RPC_EXCHANGE: &str = "koinos.rpc";
/// Prefix of every service's RPC queue / routing key.
pub const RPC_QUEUE_PREFIX: &str = "koinos.rpc.";

const OCTET_STREAM: &str = "application/octet-stream";

/// Routing key used to reach `service`.
pub fn routing_key(service: Service) -> String {
    format!("{}{}", RPC_QUEUE_PREFIX, service)
}

// =============================================================================
// Pending replies
// =============================================================================

/// Callers waiting for a reply, keyed by correlation id.
#[derive(Clone, Default)]
pub struct PendingReplies {
    inner: Arc<Mutex<PendingState>>,
}

#[derive(Default)]
struct PendingState {
    waiting: HashMap<String, oneshot::Sender<Vec<u8>>>,
    closed: bool,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a correlation id. Returns `None` once the table has been closed.
    pub fn register(&self, correlation_id: &str) -> Option<oneshot::Receiver<Vec<u8>>> {
        let mut state = self.inner.lock();
        if state.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        state.waiting.insert(correlation_id.to_string(), tx);
        Some(rx)
    }

    /// Hand a reply to its waiter. Returns false when nobody is waiting for it.
    pub fn resolve(&self, correlation_id: &str, payload: Vec<u8>) -> bool {
        let waiter = self.inner.lock().waiting.remove(correlation_id);
        match waiter {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Forget a correlation id whose caller gave up.
    pub fn cancel(&self, correlation_id: &str) {
        self.inner.lock().waiting.remove(correlation_id);
    }

    /// Refuse new registrations and wake every waiter with a closed channel.
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.closed = true;
        state.waiting.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Transport
// =============================================================================

/// AMQP transport with correlated replies.
pub struct AmqpTransport {
    channel: Channel,
    reply_queue: ShortString,
    pending: PendingReplies,
    consumer_task: tokio::task::JoinHandle<()>,
    // Held so the connection lives as long as the transport.
    _connection: Connection,
}

impl AmqpTransport {
    /// Connect to the broker and start listening on a private reply queue.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let connection_error = |e: lapin::Error| TransportError::Connection {
            endpoint: url.to_string(),
            message: e.to_string(),
        };

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(connection_error)?;
        let channel = connection
            .create_channel()
            .await
            .map_err(connection_error)?;

        let queue = channel
            .queue_declare(
                "",
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(connection_error)?;
        let reply_queue = queue.name().clone();

        let consumer = channel
            .basic_consume(
                reply_queue.as_str(),
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    exclusive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(connection_error)?;

        let pending = PendingReplies::new();
        let consumer_task = tokio::spawn(route_replies(consumer, pending.clone()));
        debug!(%url, reply_queue = reply_queue.as_str(), "amqp transport connected");

        Ok(Self {
            channel,
            reply_queue,
            pending,
            consumer_task,
            _connection: connection,
        })
    }

    async fn publish(
        &self,
        service: Service,
        correlation_id: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<(), lapin::Error> {
        let properties = BasicProperties::default()
            .with_content_type(OCTET_STREAM.into())
            .with_correlation_id(correlation_id.into())
            .with_reply_to(self.reply_queue.clone())
            .with_expiration(timeout.as_millis().to_string().into());

        self.channel
            .basic_publish(
                RPC_EXCHANGE,
                &routing_key(service),
                BasicPublishOptions::default(),
                request,
                properties,
            )
            .await?
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for AmqpTransport {
    fn name(&self) -> &'static str {
        "amqp"
    }

    async fn call(
        &self,
        service: Service,
        request: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let correlation_id = Uuid::new_v4().to_string();
        trace!(%service, %correlation_id, bytes = request.len(), "amqp rpc request");

        let send = async {
            self.publish(service, &correlation_id, &request, timeout)
                .await
                .map_err(|e| format!("publish failed: {}", e))
        };
        await_reply(&self.pending, service, &correlation_id, timeout, send).await
    }
}

/// Register `correlation_id`, run `send`, then wait for the routed reply.
///
/// `send` and the wait share one deadline. On failure or timeout the id is
/// removed from `pending`, so a late reply is dropped.
async fn await_reply<F>(
    pending: &PendingReplies,
    service: Service,
    correlation_id: &str,
    timeout: Duration,
    send: F,
) -> Result<Vec<u8>, TransportError>
where
    F: Future<Output = Result<(), String>>,
{
    let reply = pending
        .register(correlation_id)
        .ok_or_else(|| TransportError::Failure {
            service,
            message: "amqp reply consumer has stopped".to_string(),
        })?;

    let exchange = async {
        send.await?;
        reply
            .await
            .map_err(|_| "reply channel closed before a response arrived".to_string())
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(message)) => {
            pending.cancel(correlation_id);
            Err(TransportError::Failure { service, message })
        }
        Err(_) => {
            pending.cancel(correlation_id);
            Err(TransportError::Timeout { service, timeout })
        }
    }
}

impl Drop for AmqpTransport {
    fn drop(&mut self) {
        self.consumer_task.abort();
        self.pending.close();
    }
}

/// Route every delivery on the reply queue to its waiting caller.
async fn route_replies(mut consumer: Consumer, pending: PendingReplies) {
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(error = %err, "amqp reply consumer failed");
                break;
            }
        };

        let correlation_id = delivery
            .properties
            .correlation_id()
            .as_ref()
            .map(|id| id.to_string());
        route_delivery(&pending, correlation_id.as_deref(), delivery.data);
    }
    pending.close();
}

/// Hand one delivery to its waiter. Returns false when the reply was dropped.
fn route_delivery(pending: &PendingReplies, correlation_id: Option<&str>, data: Vec<u8>) -> bool {
    let Some(correlation_id) = correlation_id else {
        debug!("dropping amqp reply without correlation id");
        return false;
    };
    let delivered = pending.resolve(correlation_id, data);
    if !delivered {
        debug!(%correlation_id, "dropping amqp reply nobody is waiting for");
    }
    delivered
}
