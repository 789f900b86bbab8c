//! Session grant and release.

use std::sync::Arc;

use async_trait::async_trait;
use sensorlink_protocol::ControlTransport;
use sensorlink_types::{ControlValue, Method, MethodCall, SessionId};
use tracing::{debug, info};

use crate::error::ClientError;

/// The service side that hands out and takes back sessions.
#[async_trait]
pub trait SessionManager: Send + Sync + 'static {
    /// Obtain a session on `sensor_id`.
    async fn request_session(&self, sensor_id: &str) -> Result<SessionId, ClientError>;

    /// Give back `session_id` on the channel named `channel_id`.
    async fn release(&self, channel_id: &str, session_id: SessionId) -> Result<(), ClientError>;
}

/// [`SessionManager`] reached through a control transport bound to the
/// manager's address.
pub struct RemoteSessionManager {
    transport: Arc<dyn ControlTransport>,
}

impl RemoteSessionManager {
    pub fn new(transport: Arc<dyn ControlTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl SessionManager for RemoteSessionManager {
    async fn request_session(&self, sensor_id: &str) -> Result<SessionId, ClientError> {
        let loaded = self
            .transport
            .call(MethodCall::new(
                Method::LoadPlugin,
                vec![ControlValue::from(sensor_id)],
            ))
            .await?;
        if loaded.as_bool() != Some(true) {
            return Err(ClientError::SessionRefused {
                sensor: sensor_id.to_string(),
                reason: "plugin could not be loaded".to_string(),
            });
        }
        debug!(sensor = sensor_id, "plugin loaded");

        let granted = self
            .transport
            .call(MethodCall::new(
                Method::RequestSensor,
                vec![ControlValue::from(sensor_id)],
            ))
            .await?;
        let session_id = SessionId(granted.as_i32().unwrap_or(-1));
        if !session_id.is_granted() {
            return Err(ClientError::SessionRefused {
                sensor: sensor_id.to_string(),
                reason: format!("no session granted ({session_id})"),
            });
        }
        info!(sensor = sensor_id, session = %session_id, "session granted");
        Ok(session_id)
    }

    async fn release(&self, channel_id: &str, session_id: SessionId) -> Result<(), ClientError> {
        let released = self
            .transport
            .call(MethodCall::new(
                Method::ReleaseSensor,
                vec![ControlValue::from(channel_id), ControlValue::Int(session_id.0)],
            ))
            .await?;
        if released.as_bool() == Some(false) {
            return Err(ClientError::SessionRefused {
                sensor: channel_id.to_string(),
                reason: format!("release of session {session_id} refused"),
            });
        }
        info!(channel = channel_id, session = %session_id, "session released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlink_protocol::mock::MockTransport;
    use sensorlink_types::{ChannelAddress, RemoteError};

    fn manager() -> (RemoteSessionManager, sensorlink_protocol::mock::MockTransportHandle) {
        let transport = MockTransport::new(ChannelAddress::new(
            "/SensorManager",
            "local.SensorManager",
        ));
        let handle = transport.handle();
        (RemoteSessionManager::new(Arc::new(transport)), handle)
    }

    #[tokio::test]
    async fn grants_session_after_loading_plugin() {
        let (manager, handle) = manager();
        handle.set_value(Method::LoadPlugin, ControlValue::Bool(true));
        handle.set_value(Method::RequestSensor, ControlValue::Int(7));

        let session = manager.request_session("alssensor").await.unwrap();
        assert_eq!(session, SessionId(7));
        assert_eq!(handle.count(Method::LoadPlugin), 1);
    }

    #[tokio::test]
    async fn negative_grant_is_refused() {
        let (manager, handle) = manager();
        handle.set_value(Method::LoadPlugin, ControlValue::Bool(true));
        handle.set_value(Method::RequestSensor, ControlValue::Int(-1));

        let err = manager.request_session("alssensor").await.unwrap_err();
        assert!(matches!(err, ClientError::SessionRefused { .. }));
    }

    #[tokio::test]
    async fn unloaded_plugin_skips_request() {
        let (manager, handle) = manager();
        handle.set_value(Method::LoadPlugin, ControlValue::Bool(false));

        assert!(manager.request_session("nosuchsensor").await.is_err());
        assert_eq!(handle.count(Method::RequestSensor), 0);
    }

    #[tokio::test]
    async fn release_surfaces_transport_errors() {
        let (manager, handle) = manager();
        handle.fail(Method::ReleaseSensor, RemoteError::new("Failed", "unknown session"));

        let err = manager.release("alssensor", SessionId(3)).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }
}
