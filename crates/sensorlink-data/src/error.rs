//! Data channel errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataChannelError {
    #[error("failed to connect data socket: {0}")]
    Connect(String),

    #[error("failed to disconnect data socket: {0}")]
    Disconnect(String),

    #[error("data socket not connected")]
    NotConnected,

    #[error("data socket closed by peer")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
