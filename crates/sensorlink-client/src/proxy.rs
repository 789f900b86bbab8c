//! Remote calls on one sensor channel.
//!
//! Mutating calls are issued and return at once. A small task waits for
//! each reply, reports it to the owning client as a [`CallCompletion`]
//! over a channel, and then resolves the caller's [`CallHandle`]. The
//! client applies completions on its own schedule, so error state is only
//! ever mutated by its owner, whichever thread the reply arrived on.

use std::sync::Arc;

use sensorlink_protocol::{ControlTransport, PendingReply};
use sensorlink_types::{
    ControlValue, DataRange, IntegerRange, Method, MethodCall, RemoteError, SensorErrorKind,
    SessionId,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use crate::cache::Setting;

/// Outcome of an issued call, as delivered to the owning client.
#[derive(Debug, Clone, PartialEq)]
pub struct CallCompletion {
    pub method: Method,
    /// Error kind recorded if the call failed.
    pub failure_kind: SensorErrorKind,
    pub outcome: Result<ControlValue, RemoteError>,
}

/// Caller-side handle to an issued call.
///
/// Dropping it does not cancel the call; the completion still reaches the
/// client's error state.
#[derive(Debug)]
pub struct CallHandle {
    method: Method,
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Done(Result<ControlValue, RemoteError>),
    InFlight(oneshot::Receiver<Result<ControlValue, RemoteError>>),
}

impl CallHandle {
    /// A handle for a call that was not needed and counts as successful.
    pub fn completed(method: Method) -> Self {
        Self {
            method,
            state: HandleState::Done(Ok(ControlValue::Unit)),
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Wait for the reply.
    pub async fn wait(self) -> Result<ControlValue, RemoteError> {
        match self.state {
            HandleState::Done(outcome) => outcome,
            HandleState::InFlight(rx) => rx.await.unwrap_or_else(|_| Err(RemoteError::disconnected())),
        }
    }
}

/// Issues remote calls for one session channel.
#[derive(Clone)]
pub struct ControlChannelProxy {
    transport: Arc<dyn ControlTransport>,
    completions: mpsc::UnboundedSender<CallCompletion>,
}

impl ControlChannelProxy {
    pub fn new(
        transport: Arc<dyn ControlTransport>,
        completions: mpsc::UnboundedSender<CallCompletion>,
    ) -> Self {
        Self {
            transport,
            completions,
        }
    }

    pub fn transport(&self) -> &Arc<dyn ControlTransport> {
        &self.transport
    }

    pub fn is_valid(&self) -> bool {
        self.transport.is_valid()
    }

    /// Issue `call` and track its completion.
    ///
    /// Must be called from within a tokio runtime.
    pub fn issue(&self, call: MethodCall, failure_kind: SensorErrorKind) -> CallHandle {
        let method = call.method;
        trace!(%call, "issuing");
        let pending = self.transport.issue(call);
        let (reply_tx, reply_rx) = oneshot::channel();
        tokio::spawn(forward(
            pending,
            method,
            failure_kind,
            self.completions.clone(),
            reply_tx,
        ));
        CallHandle {
            method,
            state: HandleState::InFlight(reply_rx),
        }
    }

    pub fn start(&self, session_id: SessionId) -> CallHandle {
        self.issue(
            MethodCall::new(Method::Start, vec![ControlValue::Int(session_id.0)]),
            SensorErrorKind::HwSensorStartFailed,
        )
    }

    pub fn stop(&self, session_id: SessionId) -> CallHandle {
        self.issue(
            MethodCall::new(Method::Stop, vec![ControlValue::Int(session_id.0)]),
            SensorErrorKind::CannotAccessSensor,
        )
    }

    /// Apply one session setting remotely.
    pub fn apply(&self, session_id: SessionId, setting: Setting) -> CallHandle {
        self.issue(
            MethodCall::new(
                setting.method(),
                vec![ControlValue::Int(session_id.0), setting.value()],
            ),
            SensorErrorKind::CannotAccessSensor,
        )
    }

    pub fn set_data_range_index(&self, session_id: SessionId, index: i32) -> CallHandle {
        self.issue(
            MethodCall::new(
                Method::SetDataRangeIndex,
                vec![ControlValue::Int(session_id.0), ControlValue::Int(index)],
            ),
            SensorErrorKind::CannotAccessSensor,
        )
    }

    /// Ask for a data range. No reply is awaited and failures go unrecorded.
    pub fn request_data_range(&self, session_id: SessionId, range: DataRange) {
        self.transport.notify(MethodCall::new(
            Method::RequestDataRange,
            vec![ControlValue::Int(session_id.0), ControlValue::DataRange(range)],
        ));
    }

    /// Withdraw a data range request. No reply is awaited.
    pub fn remove_data_range_request(&self, session_id: SessionId) {
        self.transport.notify(MethodCall::new(
            Method::RemoveDataRangeRequest,
            vec![ControlValue::Int(session_id.0)],
        ));
    }

    /// Read a remote property, falling back to `T::default()` when the
    /// query fails or the reply has the wrong type.
    async fn query<T, F>(&self, method: Method, convert: F) -> T
    where
        T: Default,
        F: FnOnce(ControlValue) -> Option<T>,
    {
        match self.transport.call(MethodCall::bare(method)).await {
            Ok(value) => convert(value).unwrap_or_else(|| {
                warn!(%method, "unexpected reply type");
                T::default()
            }),
            Err(e) => {
                warn!(%method, error = %e, "query failed");
                T::default()
            }
        }
    }

    /// The service reports the interval unsigned; values past `i32::MAX`
    /// wrap.
    #[allow(clippy::cast_possible_wrap)]
    pub async fn interval(&self) -> i32 {
        self.query(Method::Interval, |v| {
            v.as_u32().map(|n| n as i32).or_else(|| v.as_i32())
        })
        .await
    }

    pub async fn buffer_interval(&self) -> u32 {
        self.query(Method::BufferInterval, |v| v.as_u32()).await
    }

    pub async fn buffer_size(&self) -> u32 {
        self.query(Method::BufferSize, |v| v.as_u32()).await
    }

    /// The service exposes standby override as a numeric property.
    pub async fn standby_override(&self) -> bool {
        self.query(Method::StandbyOverride, |v| v.as_u32().map(|n| n != 0))
            .await
    }

    pub async fn downsampling(&self) -> bool {
        self.query(Method::Downsampling, |v| {
            v.as_bool().or_else(|| v.as_u32().map(|n| n != 0))
        })
        .await
    }

    pub async fn description(&self) -> String {
        self.query(Method::Description, ControlValue::into_text).await
    }

    pub async fn id(&self) -> String {
        self.query(Method::Id, ControlValue::into_text).await
    }

    pub async fn sensor_type(&self) -> String {
        self.query(Method::Type, ControlValue::into_text).await
    }

    pub async fn hw_buffering(&self) -> bool {
        self.query(Method::HwBuffering, |v| v.as_bool()).await
    }

    pub async fn available_data_ranges(&self) -> Vec<DataRange> {
        self.query(Method::GetAvailableDataRanges, ControlValue::into_data_ranges)
            .await
    }

    pub async fn current_data_range(&self) -> DataRange {
        self.query(Method::GetCurrentDataRange, ControlValue::into_data_range)
            .await
    }

    pub async fn available_intervals(&self) -> Vec<DataRange> {
        self.query(Method::GetAvailableIntervals, ControlValue::into_data_ranges)
            .await
    }

    pub async fn available_buffer_intervals(&self) -> Vec<IntegerRange> {
        self.query(
            Method::GetAvailableBufferIntervals,
            ControlValue::into_integer_ranges,
        )
        .await
    }

    pub async fn available_buffer_sizes(&self) -> Vec<IntegerRange> {
        self.query(
            Method::GetAvailableBufferSizes,
            ControlValue::into_integer_ranges,
        )
        .await
    }

    pub async fn error_code(&self) -> SensorErrorKind {
        self.query(Method::ErrorCodeInt, |v| {
            v.as_i32().map(SensorErrorKind::from_code)
        })
        .await
    }

    pub async fn error_string(&self) -> String {
        self.query(Method::ErrorString, ControlValue::into_text).await
    }
}

async fn forward(
    pending: PendingReply,
    method: Method,
    failure_kind: SensorErrorKind,
    completions: mpsc::UnboundedSender<CallCompletion>,
    reply_tx: oneshot::Sender<Result<ControlValue, RemoteError>>,
) {
    let outcome = pending.outcome().await;
    // Report to the owner first so that a caller who awaited the handle
    // finds the completion already queued.
    let _ = completions.send(CallCompletion {
        method,
        failure_kind,
        outcome: outcome.clone(),
    });
    let _ = reply_tx.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlink_protocol::mock::{CallKind, MockTransport};

    fn proxy() -> (
        ControlChannelProxy,
        sensorlink_protocol::mock::MockTransportHandle,
        mpsc::UnboundedReceiver<CallCompletion>,
    ) {
        let transport = MockTransport::default();
        let handle = transport.handle();
        let (tx, rx) = mpsc::unbounded_channel();
        (ControlChannelProxy::new(Arc::new(transport), tx), handle, rx)
    }

    #[tokio::test]
    async fn completion_is_queued_before_handle_resolves() {
        let (proxy, handle, mut completions) = proxy();
        handle.fail(Method::Start, RemoteError::new("Failed", "no hardware"));

        let reply = proxy.start(SessionId(2)).wait().await;
        assert_eq!(reply.unwrap_err().message, "no hardware");

        let completion = completions.try_recv().unwrap();
        assert_eq!(completion.method, Method::Start);
        assert_eq!(completion.failure_kind, SensorErrorKind::HwSensorStartFailed);
    }

    #[tokio::test]
    async fn setting_carries_session_first() {
        let (proxy, handle, _completions) = proxy();
        proxy
            .apply(SessionId(7), Setting::BufferSize(16))
            .wait()
            .await
            .unwrap();

        let issued = handle.calls_of(CallKind::Issued);
        assert_eq!(
            issued,
            vec![MethodCall::new(
                Method::SetBufferSize,
                vec![ControlValue::Int(7), ControlValue::UInt(16)],
            )]
        );
    }

    #[tokio::test]
    async fn data_range_requests_are_notifications() {
        let (proxy, handle, mut completions) = proxy();
        proxy.request_data_range(SessionId(1), DataRange::new(-2.0, 2.0, 0.1));
        proxy.remove_data_range_request(SessionId(1));

        assert_eq!(handle.calls_of(CallKind::Notified).len(), 2);
        assert!(handle.calls_of(CallKind::Issued).is_empty());
        tokio::task::yield_now().await;
        assert!(completions.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_query_falls_back_to_default() {
        let (proxy, handle, _completions) = proxy();
        handle.fail(Method::Description, RemoteError::new("Failed", "gone"));
        handle.set_value(Method::StandbyOverride, ControlValue::UInt(1));

        assert_eq!(proxy.description().await, "");
        assert!(proxy.standby_override().await);
    }

    #[tokio::test]
    async fn unsigned_interval_wraps_to_signed() {
        let (proxy, handle, _completions) = proxy();
        handle.set_value(Method::Interval, ControlValue::UInt(u32::MAX));
        assert_eq!(proxy.interval().await, -1);

        handle.set_value(Method::Interval, ControlValue::Int(-5));
        assert_eq!(proxy.interval().await, -5);
    }
}
