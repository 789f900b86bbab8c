//! Config loading and client wiring.

use std::path::PathBuf;
use std::sync::Arc;

use sensorlink_data::UnixDataSocket;
use sensorlink_protocol::StreamConnection;
use tracing::info;

use crate::client::SensorClient;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::manager::{RemoteSessionManager, SessionManager};

/// Load configuration from the given path, or the default location.
pub fn load_config(path: Option<&str>) -> Result<ClientConfig, ClientError> {
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => default_config_path(),
    };

    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {e}")))?;
        let config: ClientConfig = toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {e}")))?;
        info!(path = %config_path.display(), "loaded config");
        Ok(config)
    } else {
        info!("no config file found, using defaults");
        Ok(ClientConfig::default())
    }
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("sensorlink")
}

fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Connect to the service, obtain a session on `sensor_id` and build a
/// client for it, seeded with the configured defaults.
pub async fn open_client(
    config: &ClientConfig,
    sensor_id: &str,
) -> Result<SensorClient, ClientError> {
    let connection = StreamConnection::connect_unix(&config.service.control_socket).await?;

    let manager: Arc<dyn SessionManager> = Arc::new(RemoteSessionManager::new(Arc::new(
        connection.transport(config.manager.address()),
    )));
    let session_id = manager.request_session(sensor_id).await?;

    let transport = Arc::new(connection.transport(config.channel.address(sensor_id)));
    let socket = Box::new(UnixDataSocket::new(&config.service.data_socket));
    let client = SensorClient::connect(session_id, transport, socket)
        .await
        .with_manager(manager)
        .with_settings(config.defaults.settings());

    info!(sensor = sensor_id, session = %session_id, "client ready");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("sensorlink-no-such-config.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let path = std::env::temp_dir().join(format!(
            "sensorlink-bad-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "log_level = [").unwrap();
        let result = load_config(path.to_str());
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn config_dir_is_namespaced() {
        assert!(config_dir().ends_with("sensorlink"));
    }
}
