//! Client configuration loaded from TOML.

use std::path::PathBuf;

use sensorlink_types::ChannelAddress;
use serde::{Deserialize, Serialize};

use crate::cache::Setting;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub defaults: SessionDefaults,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            channel: ChannelConfig::default(),
            manager: ManagerConfig::default(),
            defaults: SessionDefaults::default(),
            log_level: default_log_level(),
        }
    }
}

/// Where the sensor service listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_control_socket")]
    pub control_socket: PathBuf,
    #[serde(default = "default_data_socket")]
    pub data_socket: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            control_socket: default_control_socket(),
            data_socket: default_data_socket(),
        }
    }
}

/// How sensor channels are addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Object path prefix; the sensor id is appended.
    #[serde(default = "default_manager_path")]
    pub path_prefix: String,
    #[serde(default = "default_channel_interface")]
    pub interface: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            path_prefix: default_manager_path(),
            interface: default_channel_interface(),
        }
    }
}

impl ChannelConfig {
    pub fn address(&self, sensor_id: &str) -> ChannelAddress {
        ChannelAddress::new(
            format!("{}/{sensor_id}", self.path_prefix.trim_end_matches('/')),
            self.interface.clone(),
        )
    }
}

/// Address of the session manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_manager_path")]
    pub path: String,
    #[serde(default = "default_manager_interface")]
    pub interface: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            path: default_manager_path(),
            interface: default_manager_interface(),
        }
    }
}

impl ManagerConfig {
    pub fn address(&self) -> ChannelAddress {
        ChannelAddress::new(self.path.clone(), self.interface.clone())
    }
}

/// Session settings applied to every new client before it starts.
///
/// Only the values given here are stored, so absent keys are not replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standby_override: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downsampling: Option<bool>,
}

impl SessionDefaults {
    pub fn settings(&self) -> Vec<Setting> {
        [
            self.standby_override.map(Setting::StandbyOverride),
            self.interval.map(Setting::Interval),
            self.buffer_interval.map(Setting::BufferInterval),
            self.buffer_size.map(Setting::BufferSize),
            self.downsampling.map(Setting::Downsampling),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_control_socket() -> PathBuf {
    PathBuf::from("/run/sensorlink/control.sock")
}

fn default_data_socket() -> PathBuf {
    PathBuf::from("/run/sensorlink/data.sock")
}

fn default_manager_path() -> String {
    "/SensorManager".to_string()
}

fn default_manager_interface() -> String {
    "local.SensorManager".to_string()
}

fn default_channel_interface() -> String {
    "local.SensorChannel".to_string()
}
