//! Session-scoped sensor client.
//!
//! A [`SensorClient`] is one caller's handle to a remote sensor channel.
//! It drives two independent paths to the sensor service: the control
//! channel, for remote calls such as start, stop and set-interval, and the
//! data channel, a byte stream of samples. Configuration set before the
//! session starts is cached and replayed on start; configuration set while
//! running is applied live. Failures on either path are recorded rather
//! than raised, and display power-state changes pause and resume delivery
//! unless standby override is set.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod error_state;
pub mod manager;
pub mod power;
pub mod proxy;
pub mod setup;
pub mod state;

pub use cache::{ConfigCache, Setting};
pub use client::{Activity, SensorClient};
pub use config::{ChannelConfig, ClientConfig, ManagerConfig, ServiceConfig, SessionDefaults};
pub use error::ClientError;
pub use error_state::ErrorState;
pub use manager::{RemoteSessionManager, SessionManager};
pub use power::{GateAction, PowerStateGate};
pub use proxy::{CallCompletion, CallHandle, ControlChannelProxy};
pub use setup::{load_config, open_client};
pub use state::SessionState;
