//! Shared types for sensorlink.
//!
//! This crate contains the types shared across the sensorlink workspace:
//! session and channel identity, the error taxonomy surfaced to callers,
//! data range descriptors, control-channel values and the request/reply
//! envelopes exchanged with the sensor service.

pub mod error;
pub mod message;
pub mod method;
pub mod range;
pub mod session;
pub mod value;

pub use error::{RemoteError, SensorErrorKind};
pub use message::{ControlReply, ControlRequest, ProtocolVersion, PROTOCOL_VERSION};
pub use method::{Method, MethodCall};
pub use range::{parse_data_range_list, DataRange, IntegerRange, ParseRangeError};
pub use session::{ChannelAddress, SessionId};
pub use value::ControlValue;
