//! Session and channel identity.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Opaque session identifier issued by the sensor manager.
///
/// A single sensor channel may be shared by several sessions at once, so
/// every session-scoped remote call carries this id as its first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct SessionId(pub i32);

impl SessionId {
    /// Whether the manager actually granted this session.
    ///
    /// The manager answers a refused request with a negative id.
    pub fn is_granted(self) -> bool {
        self.0 >= 0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of one remote object: an object path plus the interface name
/// its methods are resolved against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub struct ChannelAddress {
    pub path: String,
    pub interface: String,
}

impl ChannelAddress {
    pub fn new(path: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            interface: interface.into(),
        }
    }
}

impl std::fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.path, self.interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_session_is_negative() {
        assert!(SessionId(0).is_granted());
        assert!(SessionId(7).is_granted());
        assert!(!SessionId(-1).is_granted());
    }

    #[test]
    fn channel_address_display() {
        let addr = ChannelAddress::new("/SensorManager/accelerometersensor", "local.AccelerometerSensor");
        assert_eq!(
            addr.to_string(),
            "/SensorManager/accelerometersensor#local.AccelerometerSensor"
        );
    }
}
