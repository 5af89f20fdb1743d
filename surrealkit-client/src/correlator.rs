//! Request/response correlation by id.

use crate::error::ClientError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use surrealkit_protocol::RpcError;
use tokio::sync::oneshot;

/// What a waiting request is resolved with: a result value or a critical error.
pub type Outcome = Result<Value, RpcError>;

/// A registration handed back to the caller that will await the reply.
#[derive(Debug)]
pub struct PendingReply {
    id: String,
    rx: oneshot::Receiver<Outcome>,
}

impl PendingReply {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Table of requests awaiting a reply.
///
/// The lock is only held for map operations, never across an await, so the
/// receive loop is never blocked by a waiting caller.
#[derive(Debug, Default)]
pub struct Correlator {
    slots: Mutex<HashMap<String, oneshot::Sender<Outcome>>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in the reply for `id`.
    ///
    /// Must be called before the request is transmitted.
    pub fn register(&self, id: &str) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        if self.slots.lock().insert(id.to_string(), tx).is_some() {
            tracing::warn!(id, "request id reused while still pending");
        }
        PendingReply {
            id: id.to_string(),
            rx,
        }
    }

    /// Resolves the request registered under `id`.
    ///
    /// Returns `false` when nothing is waiting for that id; the outcome is dropped.
    pub fn deliver(&self, id: &str, outcome: Outcome) -> bool {
        // Send under the lock so a timing-out waiter that finds the slot gone
        // always finds the outcome in its channel.
        let mut slots = self.slots.lock();
        let Some(tx) = slots.remove(id) else {
            tracing::debug!(id, "no pending request, dropping reply");
            return false;
        };
        if tx.send(outcome).is_err() {
            tracing::debug!(id, "waiter went away before delivery");
        }
        true
    }

    /// Returns whether a request is registered under `id`.
    pub fn is_pending(&self, id: &str) -> bool {
        self.slots.lock().contains_key(id)
    }

    /// Drops the registration for `id`.
    pub fn cancel(&self, id: &str) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    /// Drops every registration; their waiters fail with `ConnectionClosed`.
    pub fn fail_all(&self) -> usize {
        let mut slots = self.slots.lock();
        let count = slots.len();
        slots.clear();
        count
    }

    /// Returns the number of pending requests.
    pub fn pending_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Waits for the reply to a registered request.
    ///
    /// With a timeout, expiry and delivery are resolved atomically: whichever
    /// removes the registration first wins, and an outcome delivered right at
    /// expiry is still returned.
    pub async fn await_result(
        &self,
        pending: PendingReply,
        timeout: Option<Duration>,
    ) -> Result<Value, ClientError> {
        let PendingReply { id, mut rx } = pending;

        let received = match timeout {
            None => (&mut rx).await.ok(),
            Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
                Ok(received) => received.ok(),
                Err(_) => {
                    if self.cancel(&id) {
                        tracing::debug!(id = %id, "request timed out");
                        return Err(ClientError::Timeout);
                    }
                    rx.try_recv().ok()
                }
            },
        };

        match received {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(ClientError::Rpc(error)),
            None => {
                tracing::debug!(id = %id, "pending request dropped");
                Err(ClientError::ConnectionClosed)
            }
        }
    }
}
