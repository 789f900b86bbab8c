//! Control-channel framing.
//!
//! A frame is a big-endian `u32` payload length followed by the payload:
//! a [`ControlRequest`](sensorlink_types::ControlRequest) or
//! [`ControlReply`](sensorlink_types::ControlReply) in bincode v2's
//! standard configuration. Payloads above [`MAX_MESSAGE_SIZE`] are refused
//! in both directions.

use bincode::config::{self, Configuration};
use bincode::{Decode, Encode};

use crate::error::ProtocolError;

/// Length of the frame header.
pub const HEADER_LEN: usize = 4;

/// Largest payload accepted on the wire (1 MiB).
pub const MAX_MESSAGE_SIZE: u32 = 1 << 20;

fn bincode_config() -> Configuration {
    config::standard()
}

/// Build a complete frame for `msg`.
pub fn encode_frame<T: Encode>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = vec![0u8; HEADER_LEN];
    let payload_len = bincode::encode_into_std_write(msg, &mut frame, bincode_config())
        .map_err(|e| ProtocolError::Serialization(e.to_string()))?;

    let len = u32::try_from(payload_len)
        .ok()
        .filter(|len| *len <= MAX_MESSAGE_SIZE)
        .ok_or_else(|| {
            ProtocolError::Serialization(format!(
                "payload of {payload_len} bytes exceeds {MAX_MESSAGE_SIZE}"
            ))
        })?;
    frame[..HEADER_LEN].copy_from_slice(&len.to_be_bytes());
    Ok(frame)
}

/// Validate a frame header and return the payload length it announces.
pub fn payload_len(header: [u8; HEADER_LEN]) -> Result<usize, ProtocolError> {
    let len = u32::from_be_bytes(header);
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::Deserialization(format!(
            "announced payload of {len} bytes exceeds {MAX_MESSAGE_SIZE}"
        )));
    }
    usize::try_from(len).map_err(|e| ProtocolError::Deserialization(e.to_string()))
}

/// Decode a payload, the frame minus its header.
pub fn decode_payload<T: Decode<()>>(payload: &[u8]) -> Result<T, ProtocolError> {
    let (msg, _) = bincode::decode_from_slice(payload, bincode_config())
        .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlink_types::{
        ChannelAddress, ControlReply, ControlRequest, ControlValue, Method, MethodCall,
        PROTOCOL_VERSION,
    };

    #[test]
    fn header_announces_payload_length() {
        let request = ControlRequest {
            version: PROTOCOL_VERSION,
            serial: 1,
            target: ChannelAddress::new("/SensorManager/gyroscopesensor", "local.GyroscopeSensor"),
            call: MethodCall::new(Method::Start, vec![ControlValue::Int(4)]),
            reply_expected: true,
        };

        let frame = encode_frame(&request).unwrap();
        let header: [u8; HEADER_LEN] = frame[..HEADER_LEN].try_into().unwrap();
        assert_eq!(payload_len(header).unwrap(), frame.len() - HEADER_LEN);

        let decoded: ControlRequest = decode_payload(&frame[HEADER_LEN..]).unwrap();
        assert_eq!(decoded.call.method, Method::Start);
        assert_eq!(decoded.target.interface, "local.GyroscopeSensor");
    }

    #[test]
    fn oversized_header_is_rejected() {
        let header = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        assert!(matches!(
            payload_len(header),
            Err(ProtocolError::Deserialization(_))
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let reply = ControlReply::ok(2, ControlValue::Text("accelerometersensor".into()));
        let frame = encode_frame(&reply).unwrap();
        let result: Result<ControlReply, _> = decode_payload(&frame[HEADER_LEN..frame.len() - 3]);
        assert!(matches!(result, Err(ProtocolError::Deserialization(_))));
    }
}
