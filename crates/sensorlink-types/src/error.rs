//! Error taxonomy surfaced to sensor clients.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Kind of the error currently recorded for a sensor session.
///
/// The remote service reports its own error state as a plain integer
/// (`errorCodeInt`); codes this client does not know are passed through
/// as [`SensorErrorKind::Other`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum SensorErrorKind {
    #[default]
    NoError,
    /// The data socket could not be connected, or was lost or failed to close.
    ClientSocketError,
    /// The remote service refused to start the sensor.
    HwSensorStartFailed,
    /// Any other failed control request (stop and every setter).
    CannotAccessSensor,
    /// A remote code outside this taxonomy.
    Other(i32),
}

impl SensorErrorKind {
    /// Numeric code used on the wire.
    pub fn code(self) -> i32 {
        match self {
            Self::NoError => 0,
            Self::ClientSocketError => 1,
            Self::HwSensorStartFailed => 2,
            Self::CannotAccessSensor => 3,
            Self::Other(code) => code,
        }
    }

    /// Map a wire code back to a kind.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::ClientSocketError,
            2 => Self::HwSensorStartFailed,
            3 => Self::CannotAccessSensor,
            other => Self::Other(other),
        }
    }

    pub fn is_error(self) -> bool {
        self != Self::NoError
    }
}

impl std::fmt::Display for SensorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoError => write!(f, "NoError"),
            Self::ClientSocketError => write!(f, "ClientSocketError"),
            Self::HwSensorStartFailed => write!(f, "HwSensorStartFailed"),
            Self::CannotAccessSensor => write!(f, "CannotAccessSensor"),
            Self::Other(code) => write!(f, "Other({code})"),
        }
    }
}

/// Error returned by the remote service for a single control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct RemoteError {
    /// Machine-readable error name, e.g. `NoSuchMethod`.
    pub name: String,
    /// Human-readable message, surfaced verbatim through the error state.
    pub message: String,
}

impl RemoteError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The channel went away before the reply arrived.
    pub fn disconnected() -> Self {
        Self::new("Disconnected", "control channel closed before reply")
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for RemoteError {}
