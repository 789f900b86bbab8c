//! Streaming data channel for sensorlink.
//!
//! Defines the [`DataSocket`] trait for the byte-stream path that carries
//! sensor samples, the [`DataChannel`] that owns a socket for the lifetime
//! of a session and drains it on readiness, and the [`SampleDecoder`]
//! contract through which callers turn bytes into samples. A Unix-socket
//! backend is provided; the payload layout is left to the decoder.

use async_trait::async_trait;
use sensorlink_types::SessionId;

pub mod channel;
pub mod decoder;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod unix;

pub use channel::{DataChannel, Frames};
pub use decoder::{BatchDecoder, FixedSizeDecoder, SampleDecoder, DEFAULT_MAX_BATCH};
pub use error::DataChannelError;
pub use unix::UnixDataSocket;

/// A connectable, readable byte stream bound to one session.
///
/// Reads are synchronous and never block: [`bytes_available`] reports what
/// is already buffered and [`read`] either fills the whole buffer from it
/// or fails without consuming anything.
///
/// [`bytes_available`]: DataSocket::bytes_available
/// [`read`]: DataSocket::read
#[async_trait]
pub trait DataSocket: Send + 'static {
    /// Connect and announce the session the stream belongs to.
    async fn connect(&mut self, session_id: SessionId) -> Result<(), DataChannelError>;

    /// Close the connection.
    async fn disconnect(&mut self) -> Result<(), DataChannelError>;

    /// Wait until new bytes have arrived since the previous call.
    ///
    /// Bytes left buffered by an earlier drain do not count, so a partial
    /// record does not report readiness again until more data lands.
    /// Returns [`DataChannelError::Closed`] once the peer has hung up.
    async fn readable(&mut self) -> Result<(), DataChannelError>;

    /// Number of bytes that can be read without waiting.
    fn bytes_available(&mut self) -> usize;

    /// Fill `buf` completely, or return false and leave the stream untouched.
    fn read(&mut self, buf: &mut [u8]) -> bool;
}
