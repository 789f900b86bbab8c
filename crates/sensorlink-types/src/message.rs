//! Control-channel envelopes.
//!
//! Requests and replies are exchanged as length-prefixed bincode frames
//! over a single stream. Replies are correlated to requests by serial.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::method::MethodCall;
use crate::session::ChannelAddress;
use crate::value::ControlValue;

/// Current protocol version.
pub const PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion { major: 0, minor: 1 };

/// Protocol version for compatibility negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A request from client to service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ControlRequest {
    pub version: ProtocolVersion,
    /// Per-connection serial, echoed in the reply.
    pub serial: u32,
    /// Object the call is addressed to.
    pub target: ChannelAddress,
    pub call: MethodCall,
    /// When false the service must not send a reply.
    pub reply_expected: bool,
}

/// A reply from service to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ControlReply {
    pub serial: u32,
    pub outcome: Result<ControlValue, RemoteError>,
}

impl ControlReply {
    pub fn ok(serial: u32, value: ControlValue) -> Self {
        Self {
            serial,
            outcome: Ok(value),
        }
    }

    pub fn err(serial: u32, error: RemoteError) -> Self {
        Self {
            serial,
            outcome: Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::Method;

    #[test]
    fn request_bincode_roundtrip() {
        let request = ControlRequest {
            version: PROTOCOL_VERSION,
            serial: 3,
            target: ChannelAddress::new("/SensorManager/alssensor", "local.ALSSensor"),
            call: MethodCall::new(Method::SetInterval, vec![ControlValue::Int(7), ControlValue::Int(100)]),
            reply_expected: true,
        };
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&request, config).unwrap();
        let (decoded, _): (ControlRequest, _) = bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(request, decoded);
    }

    #[test]
    fn error_reply_keeps_message() {
        let reply = ControlReply::err(9, RemoteError::new("Failed", "sensor busy"));
        let config = bincode::config::standard();
        let bytes = bincode::encode_to_vec(&reply, config).unwrap();
        let (decoded, _): (ControlReply, _) = bincode::decode_from_slice(&bytes, config).unwrap();
        assert_eq!(decoded.serial, 9);
        assert_eq!(decoded.outcome.unwrap_err().message, "sensor busy");
    }
}
