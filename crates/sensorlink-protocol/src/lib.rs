//! Control-channel transport and wire protocol for sensorlink.
//!
//! This crate defines the [`ControlTransport`] trait the sensor client
//! issues its remote calls through, a stream transport that speaks
//! length-prefixed bincode frames (via bincode v2) over any async byte
//! stream, and a recording mock for tests.

pub mod connection;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod stream;
pub mod transport;
pub mod wire;

pub use connection::{MessageReceiver, MessageSender};
pub use error::ProtocolError;
pub use stream::{StreamConnection, StreamControlTransport};
pub use transport::{ControlTransport, PendingReply};
