//! Session-owned data channel and its drain loop.

use async_trait::async_trait;
use sensorlink_types::SessionId;
use tracing::{debug, info, trace};

use crate::decoder::SampleDecoder;
use crate::error::DataChannelError;
use crate::DataSocket;

/// Read access to the buffered stream, handed to decoders.
pub struct Frames<'a> {
    socket: &'a mut dyn DataSocket,
}

impl Frames<'_> {
    pub fn bytes_available(&mut self) -> usize {
        self.socket.bytes_available()
    }

    /// Fill `buf` completely or consume nothing.
    pub fn read(&mut self, buf: &mut [u8]) -> bool {
        self.socket.read(buf)
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        let mut bytes = [0u8; 4];
        self.read(&mut bytes).then(|| u32::from_le_bytes(bytes))
    }
}

/// The streaming path of one session.
///
/// The socket is connected once when the client is built and torn down
/// when it is closed. In between, readiness is only acted on while the
/// channel is subscribed, which the session keeps in step with its
/// running state.
pub struct DataChannel {
    socket: Box<dyn DataSocket>,
    connected: bool,
    subscribed: bool,
    closed: bool,
}

impl DataChannel {
    pub fn new(socket: Box<dyn DataSocket>) -> Self {
        Self {
            socket,
            connected: false,
            subscribed: false,
            closed: false,
        }
    }

    /// Connect the socket for `session_id`.
    pub async fn open(&mut self, session_id: SessionId) -> Result<(), DataChannelError> {
        self.socket.connect(session_id).await?;
        self.connected = true;
        self.closed = false;
        info!(session = %session_id, "data channel connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Start acting on readiness notifications.
    pub fn subscribe(&mut self) {
        self.subscribed = true;
        debug!("data channel subscribed");
    }

    /// Stop acting on readiness notifications. Buffered bytes stay queued.
    pub fn unsubscribe(&mut self) {
        self.subscribed = false;
        debug!("data channel unsubscribed");
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Whether the owner should currently wait on [`readable`](Self::readable).
    pub fn wants_readiness(&self) -> bool {
        self.subscribed && self.connected && !self.closed
    }

    /// Wait for the next readiness notification.
    pub async fn readable(&mut self) -> Result<(), DataChannelError> {
        match self.socket.readable().await {
            Err(DataChannelError::Closed) => {
                self.closed = true;
                Err(DataChannelError::Closed)
            }
            other => other,
        }
    }

    /// Run the decoder over everything buffered.
    ///
    /// At least one step runs per call. Further steps run while bytes
    /// remain, and the loop ends at the first step that finds no complete
    /// record. Returns the number of steps taken; nothing is read while
    /// unsubscribed.
    pub fn drain(&mut self, decoder: &mut dyn SampleDecoder) -> usize {
        if !self.subscribed {
            return 0;
        }

        let mut steps = 0;
        loop {
            steps += 1;
            let complete = decoder.decode(&mut Frames {
                socket: self.socket.as_mut(),
            });
            if !complete || self.socket.bytes_available() == 0 {
                break;
            }
        }
        trace!(steps, "drained data channel");
        steps
    }

    /// Exact read straight from the socket.
    pub fn read(&mut self, buf: &mut [u8]) -> bool {
        self.socket.read(buf)
    }

    pub fn bytes_available(&mut self) -> usize {
        self.socket.bytes_available()
    }

    /// Drop the subscription and close the socket.
    pub async fn teardown(&mut self) -> Result<(), DataChannelError> {
        self.subscribed = false;
        self.connected = false;
        self.socket.disconnect().await
    }
}

/// A channel with no socket behind it, left in place when the real one is
/// moved out with [`std::mem::take`].
impl Default for DataChannel {
    fn default() -> Self {
        Self::new(Box::new(Detached))
    }
}

struct Detached;

#[async_trait]
impl DataSocket for Detached {
    async fn connect(&mut self, _session_id: SessionId) -> Result<(), DataChannelError> {
        Err(DataChannelError::NotConnected)
    }

    async fn disconnect(&mut self) -> Result<(), DataChannelError> {
        Ok(())
    }

    async fn readable(&mut self) -> Result<(), DataChannelError> {
        Err(DataChannelError::Closed)
    }

    fn bytes_available(&mut self) -> usize {
        0
    }

    fn read(&mut self, _buf: &mut [u8]) -> bool {
        false
    }
}
