//! Mock control transport for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sensorlink_types::{ChannelAddress, ControlValue, Method, MethodCall, RemoteError};
use tokio::sync::oneshot;

use crate::error::ProtocolError;
use crate::transport::{ControlTransport, PendingReply};

/// How a call reached the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Asynchronous request with a tracked reply.
    Issued,
    /// Asynchronous request without a reply.
    Notified,
    /// Awaited query.
    Queried,
}

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub call: MethodCall,
}

type ReplySender = oneshot::Sender<Result<ControlValue, RemoteError>>;

#[derive(Debug)]
struct MockTransportState {
    calls: Vec<RecordedCall>,
    failures: HashMap<Method, RemoteError>,
    values: HashMap<Method, ControlValue>,
    valid: bool,
    hold: bool,
    held: Vec<(Method, ReplySender)>,
}

impl MockTransportState {
    fn outcome(&self, method: Method) -> Result<ControlValue, RemoteError> {
        if let Some(err) = self.failures.get(&method) {
            return Err(err.clone());
        }
        Ok(self.values.get(&method).cloned().unwrap_or_default())
    }
}

/// Mock control transport that records every call.
///
/// Replies are immediate unless [`MockTransportHandle::hold_replies`] is
/// set, in which case issued calls stay in flight until released.
pub struct MockTransport {
    address: ChannelAddress,
    state: Arc<Mutex<MockTransportState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(ChannelAddress::new(
            "/SensorManager/mocksensor",
            "local.MockSensor",
        ))
    }
}

impl MockTransport {
    pub fn new(address: ChannelAddress) -> Self {
        Self {
            address,
            state: Arc::new(Mutex::new(MockTransportState {
                calls: Vec::new(),
                failures: HashMap::new(),
                values: HashMap::new(),
                valid: true,
                hold: false,
                held: Vec::new(),
            })),
        }
    }

    /// Get a clonable handle for scripting and observing the mock.
    pub fn handle(&self) -> MockTransportHandle {
        MockTransportHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable observer handle for [`MockTransport`].
#[derive(Clone)]
pub struct MockTransportHandle {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransportHandle {
    /// Every call seen so far, in issue order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls of the given kind, in issue order.
    pub fn calls_of(&self, kind: CallKind) -> Vec<MethodCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.call)
            .collect()
    }

    /// Number of recorded calls to `method`, of any kind.
    pub fn count(&self, method: Method) -> usize {
        self.calls().iter().filter(|c| c.call.method == method).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Make every future call to `method` fail with `error`.
    pub fn fail(&self, method: Method, error: RemoteError) {
        self.state.lock().unwrap().failures.insert(method, error);
    }

    /// Make every future call to `method` succeed with `value`.
    pub fn set_value(&self, method: Method, value: ControlValue) {
        let mut state = self.state.lock().unwrap();
        state.failures.remove(&method);
        state.values.insert(method, value);
    }

    pub fn set_valid(&self, valid: bool) {
        self.state.lock().unwrap().valid = valid;
    }

    /// Keep issued calls in flight instead of answering them immediately.
    pub fn hold_replies(&self, hold: bool) {
        self.state.lock().unwrap().hold = hold;
    }

    /// Number of issued calls still waiting for a reply.
    pub fn held_count(&self) -> usize {
        self.state.lock().unwrap().held.len()
    }

    /// Answer every held call according to the current script.
    pub fn release_held(&self) {
        let mut state = self.state.lock().unwrap();
        let held = std::mem::take(&mut state.held);
        for (method, tx) in held {
            let _ = tx.send(state.outcome(method));
        }
    }
}

#[async_trait]
impl ControlTransport for MockTransport {
    fn address(&self) -> &ChannelAddress {
        &self.address
    }

    fn issue(&self, call: MethodCall) -> PendingReply {
        let mut state = self.state.lock().unwrap();
        let method = call.method;
        state.calls.push(RecordedCall {
            kind: CallKind::Issued,
            call,
        });
        if state.hold {
            let (tx, reply) = PendingReply::channel();
            state.held.push((method, tx));
            reply
        } else {
            PendingReply::ready(state.outcome(method))
        }
    }

    fn notify(&self, call: MethodCall) {
        self.state.lock().unwrap().calls.push(RecordedCall {
            kind: CallKind::Notified,
            call,
        });
    }

    async fn call(&self, call: MethodCall) -> Result<ControlValue, ProtocolError> {
        let mut state = self.state.lock().unwrap();
        let method = call.method;
        state.calls.push(RecordedCall {
            kind: CallKind::Queried,
            call,
        });
        Ok(state.outcome(method)?)
    }

    fn is_valid(&self) -> bool {
        self.state.lock().unwrap().valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn held_replies_resolve_on_release() {
        let transport = MockTransport::default();
        let handle = transport.handle();
        handle.hold_replies(true);
        handle.fail(Method::Stop, RemoteError::new("Failed", "nope"));

        let reply = transport.issue(MethodCall::new(Method::Stop, vec![ControlValue::Int(1)]));
        assert_eq!(handle.held_count(), 1);
        handle.release_held();
        assert_eq!(handle.held_count(), 0);
        assert_eq!(reply.outcome().await.unwrap_err().message, "nope");
    }

    #[tokio::test]
    async fn queries_are_recorded_separately() {
        let transport = MockTransport::default();
        let handle = transport.handle();
        handle.set_value(Method::BufferSize, ControlValue::UInt(8));

        let value = transport.call(MethodCall::bare(Method::BufferSize)).await.unwrap();
        transport.notify(MethodCall::bare(Method::RemoveDataRangeRequest));

        assert_eq!(value, ControlValue::UInt(8));
        assert_eq!(handle.calls_of(CallKind::Queried).len(), 1);
        assert_eq!(handle.calls_of(CallKind::Notified).len(), 1);
        assert!(handle.calls_of(CallKind::Issued).is_empty());
    }
}
