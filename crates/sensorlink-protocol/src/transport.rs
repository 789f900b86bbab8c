//! The control-channel transport abstraction.

use async_trait::async_trait;
use sensorlink_types::{ChannelAddress, ControlValue, MethodCall, RemoteError};
use tokio::sync::oneshot;

use crate::error::ProtocolError;

/// Request/response path to one remote sensor object.
///
/// Every transport is bound to a single [`ChannelAddress`]. Issuing never
/// blocks: [`issue`](Self::issue) and [`notify`](Self::notify) enqueue the
/// request and return immediately. Only [`call`](Self::call) suspends the
/// caller until the reply arrives.
#[async_trait]
pub trait ControlTransport: Send + Sync + 'static {
    /// The object this transport addresses.
    fn address(&self) -> &ChannelAddress;

    /// Issue a request and return a handle resolving to its reply.
    fn issue(&self, call: MethodCall) -> PendingReply;

    /// Issue a request for which no reply is wanted.
    fn notify(&self, call: MethodCall);

    /// Issue a request and wait for its reply.
    async fn call(&self, call: MethodCall) -> Result<ControlValue, ProtocolError>;

    /// Whether the underlying channel is still usable.
    fn is_valid(&self) -> bool;
}

/// In-flight reply of an issued request.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Result<ControlValue, RemoteError>>,
}

impl PendingReply {
    /// Create a pending reply and the sender that completes it.
    pub fn channel() -> (oneshot::Sender<Result<ControlValue, RemoteError>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A reply that is already known.
    pub fn ready(outcome: Result<ControlValue, RemoteError>) -> Self {
        let (tx, reply) = Self::channel();
        let _ = tx.send(outcome);
        reply
    }

    /// Wait for the reply. A dropped sender counts as a lost connection.
    pub async fn outcome(self) -> Result<ControlValue, RemoteError> {
        self.rx.await.unwrap_or_else(|_| Err(RemoteError::disconnected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_sender_reports_disconnect() {
        let (tx, reply) = PendingReply::channel();
        drop(tx);
        assert_eq!(reply.outcome().await, Err(RemoteError::disconnected()));
    }

    #[tokio::test]
    async fn ready_reply_resolves_immediately() {
        let reply = PendingReply::ready(Ok(ControlValue::Bool(true)));
        assert_eq!(reply.outcome().await, Ok(ControlValue::Bool(true)));
    }
}
