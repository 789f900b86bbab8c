//! Client errors.
//!
//! These cover building and wiring a client. Failures of an established
//! session are never raised; they are recorded in the
//! [`ErrorState`](crate::ErrorState) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("sensor {sensor} refused: {reason}")]
    SessionRefused { sensor: String, reason: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] sensorlink_protocol::ProtocolError),

    #[error("data channel error: {0}")]
    DataChannel(#[from] sensorlink_data::DataChannelError),

    #[error("power-state error: {0}")]
    Power(#[from] sensorlink_power::PowerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
