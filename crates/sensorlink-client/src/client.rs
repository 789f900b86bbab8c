//! The session client.

use std::future::Future;
use std::sync::Arc;

use sensorlink_data::{DataChannel, DataSocket, SampleDecoder};
use sensorlink_power::PowerStateSource;
use sensorlink_protocol::ControlTransport;
use sensorlink_types::{DataRange, IntegerRange, Method, SensorErrorKind, SessionId};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::cache::{ConfigCache, Setting};
use crate::error_state::ErrorState;
use crate::manager::SessionManager;
use crate::power::{GateAction, PowerStateGate};
use crate::proxy::{CallCompletion, CallHandle, ControlChannelProxy};
use crate::state::SessionState;

const SOCKET_CONNECT_FAILED: &str = "Socket connection failed.";
const SOCKET_DISCONNECT_FAILED: &str = "Socket disconnect failed.";
const SOCKET_CONNECTION_LOST: &str = "Socket connection lost.";

/// What one turn of [`SensorClient::next_event`] handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// An issued call finished.
    Completed { method: Method, ok: bool },
    /// A display change arrived and the gate chose `action`.
    DisplayChanged {
        active: bool,
        action: Option<GateAction>,
    },
    /// New bytes arrived and the decoder took `steps` steps.
    Data { steps: usize },
    /// The service hung up the data channel.
    DataClosed,
}

/// One caller's session on a remote sensor channel.
///
/// The client owns all session state: running flag, cached settings,
/// recorded error and the data channel. Control calls return as soon as
/// they are issued; their completions come back over a channel and are
/// applied when the owner next touches the client (any control operation,
/// the error accessors, [`dispatch_completions`](Self::dispatch_completions),
/// [`next_event`](Self::next_event) or [`settle`](Self::settle)).
///
/// Dropping a client that was not [`close`](Self::close)d releases the
/// session and disconnects the data channel in a background task, provided
/// a tokio runtime is available.
pub struct SensorClient {
    session_id: SessionId,
    state: SessionState,
    proxy: ControlChannelProxy,
    data: DataChannel,
    cache: ConfigCache,
    errors: ErrorState,
    gate: PowerStateGate,
    completions: mpsc::UnboundedReceiver<CallCompletion>,
    in_flight: usize,
    manager: Option<Arc<dyn SessionManager>>,
    closed: bool,
}

impl SensorClient {
    /// Build a client for `session_id` and connect its data channel.
    ///
    /// A failed connect does not fail construction; it is recorded as a
    /// [`SensorErrorKind::ClientSocketError`].
    pub async fn connect(
        session_id: SessionId,
        transport: Arc<dyn ControlTransport>,
        socket: Box<dyn DataSocket>,
    ) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let mut data = DataChannel::new(socket);
        let mut errors = ErrorState::default();

        if let Err(e) = data.open(session_id).await {
            warn!(session = %session_id, error = %e, "data channel connect failed");
            errors.set(SensorErrorKind::ClientSocketError, SOCKET_CONNECT_FAILED);
        }

        info!(session = %session_id, channel = %transport.address(), "sensor client created");
        Self {
            session_id,
            state: SessionState::Stopped,
            proxy: ControlChannelProxy::new(transport, completions_tx),
            data,
            cache: ConfigCache::default(),
            errors,
            gate: PowerStateGate::new(),
            completions,
            in_flight: 0,
            manager: None,
            closed: false,
        }
    }

    /// Release the session through `manager` when the client is closed.
    #[must_use]
    pub fn with_manager(mut self, manager: Arc<dyn SessionManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Seed the settings cache without contacting the service.
    #[must_use]
    pub fn with_settings(mut self, settings: impl IntoIterator<Item = Setting>) -> Self {
        for setting in settings {
            self.cache.store(setting);
        }
        self
    }

    /// Follow display state reported by `source`. Returns false if a
    /// source of the same name is already attached or subscribing failed.
    pub fn attach_power_source(&mut self, source: Box<dyn PowerStateSource>) -> bool {
        let name = source.name().to_string();
        match self.gate.attach(source) {
            Ok(attached) => attached,
            Err(e) => {
                warn!(source = %name, error = %e, "power source unavailable");
                false
            }
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Calls issued whose completion has not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // -- session state machine --

    pub fn start(&mut self) -> CallHandle {
        self.start_session(self.session_id)
    }

    /// Start `session_id` and replay the cached settings.
    ///
    /// Already running is a successful no-op. The returned handle tracks
    /// the start request only; replayed settings report through the error
    /// state.
    pub fn start_session(&mut self, session_id: SessionId) -> CallHandle {
        if self.is_running() {
            debug!(session = %session_id, "already running");
            return CallHandle::completed(Method::Start);
        }
        self.dispatch_completions();
        self.errors.clear();
        self.state = SessionState::Running;
        self.data.subscribe();

        let handle = self.proxy.start(session_id);
        self.in_flight += 1;
        for setting in self.cache.replay() {
            // Replayed calls report through the error state.
            let _ = self.issue_setting(session_id, setting);
        }
        info!(session = %session_id, "session started");
        handle
    }

    pub fn stop(&mut self) -> CallHandle {
        self.stop_session(self.session_id)
    }

    /// Stop `session_id`. Already stopped is a successful no-op.
    ///
    /// Calls still in flight are not retracted; their completions keep
    /// updating the error state.
    pub fn stop_session(&mut self, session_id: SessionId) -> CallHandle {
        if !self.is_running() {
            debug!(session = %session_id, "already stopped");
            return CallHandle::completed(Method::Stop);
        }
        self.dispatch_completions();
        self.errors.clear();
        self.state = SessionState::Stopped;
        self.data.unsubscribe();

        let handle = self.proxy.stop(session_id);
        self.in_flight += 1;
        info!(session = %session_id, "session stopped");
        handle
    }

    // -- settings --

    /// Apply `setting` to `session_id` on the service, bypassing the cache.
    pub fn apply_setting(&mut self, session_id: SessionId, setting: Setting) -> CallHandle {
        self.dispatch_completions();
        self.errors.clear();
        self.issue_setting(session_id, setting)
    }

    fn issue_setting(&mut self, session_id: SessionId, setting: Setting) -> CallHandle {
        self.in_flight += 1;
        self.proxy.apply(session_id, setting)
    }

    /// Cache `setting` and, while running, apply it live.
    ///
    /// Returns the handle of the remote call, or `None` when the value was
    /// only cached.
    pub fn set(&mut self, setting: Setting) -> Option<CallHandle> {
        self.cache.store(setting);
        if self.is_running() {
            Some(self.apply_setting(self.session_id, setting))
        } else {
            trace!(?setting, "setting cached");
            None
        }
    }

    pub fn set_interval(&mut self, interval: i32) -> Option<CallHandle> {
        self.set(Setting::Interval(interval))
    }

    pub fn set_buffer_interval(&mut self, interval: u32) -> Option<CallHandle> {
        self.set(Setting::BufferInterval(interval))
    }

    pub fn set_buffer_size(&mut self, size: u32) -> Option<CallHandle> {
        self.set(Setting::BufferSize(size))
    }

    pub fn set_standby_override(&mut self, enabled: bool) -> Option<CallHandle> {
        self.set(Setting::StandbyOverride(enabled))
    }

    pub fn set_downsampling(&mut self, enabled: bool) -> Option<CallHandle> {
        self.set(Setting::Downsampling(enabled))
    }

    pub fn set_data_range_index(&mut self, index: i32) -> CallHandle {
        self.dispatch_completions();
        self.errors.clear();
        self.in_flight += 1;
        self.proxy.set_data_range_index(self.session_id, index)
    }

    /// Ask the service for `range`. Failures are not tracked.
    pub fn request_data_range(&mut self, range: DataRange) {
        self.dispatch_completions();
        self.errors.clear();
        self.proxy.request_data_range(self.session_id, range);
    }

    /// Withdraw an earlier data range request. Failures are not tracked.
    pub fn remove_data_range_request(&mut self) {
        self.dispatch_completions();
        self.errors.clear();
        self.proxy.remove_data_range_request(self.session_id);
    }

    // -- getters: service while running, cache while stopped --

    pub async fn interval(&self) -> i32 {
        if self.is_running() {
            self.proxy.interval().await
        } else {
            self.cache.interval()
        }
    }

    pub async fn buffer_interval(&self) -> u32 {
        if self.is_running() {
            self.proxy.buffer_interval().await
        } else {
            self.cache.buffer_interval()
        }
    }

    pub async fn buffer_size(&self) -> u32 {
        if self.is_running() {
            self.proxy.buffer_size().await
        } else {
            self.cache.buffer_size()
        }
    }

    pub async fn standby_override(&self) -> bool {
        if self.is_running() {
            self.proxy.standby_override().await
        } else {
            self.cache.standby_override()
        }
    }

    pub async fn downsampling(&self) -> bool {
        if self.is_running() {
            self.proxy.downsampling().await
        } else {
            self.cache.downsampling()
        }
    }

    // -- uncached service properties --

    pub async fn description(&self) -> String {
        self.proxy.description().await
    }

    pub async fn id(&self) -> String {
        self.proxy.id().await
    }

    pub async fn sensor_type(&self) -> String {
        self.proxy.sensor_type().await
    }

    pub async fn hw_buffering(&self) -> bool {
        self.proxy.hw_buffering().await
    }

    pub async fn available_data_ranges(&self) -> Vec<DataRange> {
        self.proxy.available_data_ranges().await
    }

    pub async fn current_data_range(&self) -> DataRange {
        self.proxy.current_data_range().await
    }

    pub async fn available_intervals(&self) -> Vec<DataRange> {
        self.proxy.available_intervals().await
    }

    pub async fn available_buffer_intervals(&self) -> Vec<IntegerRange> {
        self.proxy.available_buffer_intervals().await
    }

    pub async fn available_buffer_sizes(&self) -> Vec<IntegerRange> {
        self.proxy.available_buffer_sizes().await
    }

    // -- errors --

    /// The local error if one is recorded, otherwise the service's.
    pub async fn error_code(&mut self) -> SensorErrorKind {
        self.dispatch_completions();
        if self.errors.is_set() {
            self.errors.code()
        } else {
            self.proxy.error_code().await
        }
    }

    /// Message matching [`error_code`](Self::error_code).
    pub async fn error_string(&mut self) -> String {
        self.dispatch_completions();
        if self.errors.is_set() {
            self.errors.message().to_string()
        } else {
            self.proxy.error_string().await
        }
    }

    /// The locally recorded error, without consulting the service.
    pub fn local_error(&mut self) -> &ErrorState {
        self.dispatch_completions();
        &self.errors
    }

    // -- completions and events --

    /// Apply every completion that has already arrived.
    pub fn dispatch_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.complete(completion);
            applied += 1;
        }
        applied
    }

    fn complete(&mut self, completion: CallCompletion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion.outcome {
            Ok(_) => trace!(method = %completion.method, "call completed"),
            Err(e) => {
                warn!(
                    session = %self.session_id,
                    method = %completion.method,
                    error = %e,
                    "call failed"
                );
                self.errors.set(completion.failure_kind, e.message);
            }
        }
    }

    /// Wait until every issued call has completed and been applied.
    pub async fn settle(&mut self) {
        self.dispatch_completions();
        while self.in_flight > 0 {
            match self.completions.recv().await {
                Some(completion) => self.complete(completion),
                None => break,
            }
        }
    }

    /// React to a display state change.
    ///
    /// Without standby override, an inactive display stops the session
    /// and an active one starts it, through the same no-op-safe paths as
    /// [`start`](Self::start) and [`stop`](Self::stop).
    pub fn display_state_changed(&mut self, active: bool) -> Option<GateAction> {
        let action = PowerStateGate::decide(active, self.cache.standby_override());
        debug!(session = %self.session_id, active, ?action, "display state changed");
        match action {
            Some(GateAction::Start) => {
                let _ = self.start();
            }
            Some(GateAction::Stop) => {
                let _ = self.stop();
            }
            None => {}
        }
        action
    }

    /// Drain the data channel through `decoder`. Returns the number of
    /// decode steps, zero while the session is not running.
    pub fn data_received(&mut self, decoder: &mut dyn SampleDecoder) -> usize {
        self.data.drain(decoder)
    }

    /// Exact read from the data channel.
    pub fn read(&mut self, buf: &mut [u8]) -> bool {
        self.data.read(buf)
    }

    /// Wait for the next completion, display change or data readiness and
    /// handle it.
    ///
    /// Data readiness is only awaited while the session is running.
    /// Cancelling the returned future loses no events.
    pub async fn next_event(&mut self, decoder: &mut dyn SampleDecoder) -> Activity {
        let wants_data = self.data.wants_readiness();
        tokio::select! {
            Some(completion) = self.completions.recv() => {
                let method = completion.method;
                let ok = completion.outcome.is_ok();
                self.complete(completion);
                Activity::Completed { method, ok }
            }
            Some(event) = self.gate.next_event() => {
                let action = self.display_state_changed(event.active);
                Activity::DisplayChanged { active: event.active, action }
            }
            ready = self.data.readable(), if wants_data => match ready {
                Ok(()) => Activity::Data { steps: self.data_received(decoder) },
                Err(e) => {
                    warn!(session = %self.session_id, error = %e, "data channel lost");
                    self.errors.set(SensorErrorKind::ClientSocketError, SOCKET_CONNECTION_LOST);
                    self.data.unsubscribe();
                    Activity::DataClosed
                }
            },
        }
    }

    /// Handle events until `shutdown` resolves.
    pub async fn run<F>(&mut self, decoder: &mut dyn SampleDecoder, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                activity = self.next_event(decoder) => trace!(?activity, "event handled"),
            }
        }
        debug!(session = %self.session_id, "event loop stopped");
    }

    /// Release the session and tear down the data channel.
    ///
    /// The release is only attempted while the control channel is still
    /// valid, using the channel id reported by the service. Failures are
    /// logged or recorded and never stop the teardown. Returns the final
    /// error state.
    pub async fn close(mut self) -> ErrorState {
        self.dispatch_completions();
        self.closed = true;

        release_session(&self.proxy, self.manager.take(), self.session_id).await;
        if let Err(e) = self.data.teardown().await {
            warn!(session = %self.session_id, error = %e, "data channel teardown failed");
            self.errors
                .set(SensorErrorKind::ClientSocketError, SOCKET_DISCONNECT_FAILED);
        }

        info!(session = %self.session_id, "sensor client closed");
        std::mem::take(&mut self.errors)
    }
}

impl Drop for SensorClient {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let session_id = self.session_id;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                session = %session_id,
                "client dropped outside a runtime, session not released"
            );
            return;
        };

        let proxy = self.proxy.clone();
        let manager = self.manager.take();
        let mut data = std::mem::take(&mut self.data);
        runtime.spawn(async move {
            release_session(&proxy, manager, session_id).await;
            if let Err(e) = data.teardown().await {
                warn!(session = %session_id, error = %e, "data channel teardown failed");
            }
            debug!(session = %session_id, "dropped client torn down");
        });
    }
}

/// Give the session back through `manager`, using the channel id the
/// service reports. Skipped once the control channel is invalid.
async fn release_session(
    proxy: &ControlChannelProxy,
    manager: Option<Arc<dyn SessionManager>>,
    session_id: SessionId,
) {
    if !proxy.is_valid() {
        debug!(session = %session_id, "control channel invalid, skipping release");
        return;
    }
    if let Some(manager) = manager {
        let channel_id = proxy.id().await;
        if let Err(e) = manager.release(&channel_id, session_id).await {
            warn!(session = %session_id, error = %e, "session release failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlink_data::mock::MockDataSocket;
    use sensorlink_protocol::mock::{CallKind, MockTransport};
    use sensorlink_types::{ControlValue, MethodCall, RemoteError};

    async fn client(session: i32) -> (SensorClient, sensorlink_protocol::mock::MockTransportHandle) {
        let transport = MockTransport::default();
        let handle = transport.handle();
        let (socket, _) = MockDataSocket::new();
        let client =
            SensorClient::connect(SessionId(session), Arc::new(transport), Box::new(socket)).await;
        (client, handle)
    }

    #[tokio::test]
    async fn stopped_setter_only_caches() {
        let (mut client, handle) = client(1).await;
        assert!(client.set_buffer_size(16).is_none());
        assert_eq!(client.buffer_size().await, 16);
        assert!(handle.calls().is_empty());
    }

    #[tokio::test]
    async fn running_setter_issues_with_session() {
        let (mut client, handle) = client(4).await;
        client.start().wait().await.unwrap();
        handle.clear_calls();

        client.set_downsampling(false).unwrap().wait().await.unwrap();
        assert_eq!(
            handle.calls_of(CallKind::Issued),
            vec![MethodCall::new(
                Method::SetDownsampling,
                vec![ControlValue::Int(4), ControlValue::Bool(false)],
            )]
        );
        assert!(!client.cache().downsampling());
    }

    #[tokio::test]
    async fn failed_start_records_hardware_error() {
        let (mut client, handle) = client(2).await;
        handle.fail(Method::Start, RemoteError::new("Failed", "no hardware"));

        let _ = client.start();
        client.settle().await;

        assert!(client.is_running());
        assert_eq!(client.error_code().await, SensorErrorKind::HwSensorStartFailed);
        assert_eq!(client.error_string().await, "no hardware");
    }

    #[tokio::test]
    async fn connect_failure_is_recorded() {
        let (socket, socket_handle) = MockDataSocket::new();
        socket_handle.fail_connect(true);
        let mut client = SensorClient::connect(
            SessionId(1),
            Arc::new(MockTransport::default()),
            Box::new(socket),
        )
        .await;

        assert_eq!(client.error_code().await, SensorErrorKind::ClientSocketError);
        assert_eq!(client.error_string().await, "Socket connection failed.");
    }
}
