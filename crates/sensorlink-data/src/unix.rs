//! Unix-socket data channel backend.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sensorlink_types::SessionId;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::error::DataChannelError;
use crate::DataSocket;

const READ_CHUNK: usize = 4096;

/// Data socket speaking to the sensor service over a Unix stream socket.
///
/// After connecting, the session id is written as a little-endian `i32` so
/// the service can route that session's samples to this stream. Incoming
/// bytes are pulled into a local buffer without blocking, which is what
/// lets [`bytes_available`](DataSocket::bytes_available) and exact reads
/// work synchronously.
pub struct UnixDataSocket {
    path: PathBuf,
    stream: Option<UnixStream>,
    buffer: VecDeque<u8>,
    fresh: bool,
    eof: bool,
}

impl UnixDataSocket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: None,
            buffer: VecDeque::new(),
            fresh: false,
            eof: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pull whatever the kernel has buffered, without waiting.
    fn fill(&mut self) {
        let Some(stream) = self.stream.as_ref() else {
            return;
        };
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.try_read(&mut chunk) {
                Ok(0) => {
                    debug!(path = %self.path.display(), "data socket reached EOF");
                    self.eof = true;
                    break;
                }
                Ok(n) => {
                    self.buffer.extend(&chunk[..n]);
                    self.fresh = true;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "data socket read failed");
                    self.eof = true;
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl DataSocket for UnixDataSocket {
    async fn connect(&mut self, session_id: SessionId) -> Result<(), DataChannelError> {
        let mut stream = UnixStream::connect(&self.path)
            .await
            .map_err(|e| DataChannelError::Connect(format!("{}: {e}", self.path.display())))?;
        stream
            .write_all(&session_id.0.to_le_bytes())
            .await
            .map_err(|e| DataChannelError::Connect(e.to_string()))?;

        self.buffer.clear();
        self.fresh = false;
        self.eof = false;
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DataChannelError> {
        let mut stream = self.stream.take().ok_or(DataChannelError::NotConnected)?;
        self.buffer.clear();
        stream
            .shutdown()
            .await
            .map_err(|e| DataChannelError::Disconnect(e.to_string()))
    }

    async fn readable(&mut self) -> Result<(), DataChannelError> {
        loop {
            if std::mem::take(&mut self.fresh) {
                return Ok(());
            }
            if self.eof {
                return Err(DataChannelError::Closed);
            }
            let stream = self.stream.as_ref().ok_or(DataChannelError::NotConnected)?;
            stream.readable().await?;
            self.fill();
        }
    }

    fn bytes_available(&mut self) -> usize {
        self.fill();
        self.buffer.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> bool {
        if self.buffer.len() < buf.len() {
            self.fill();
        }
        if self.buffer.len() < buf.len() {
            return false;
        }
        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.buffer.drain(..n)) {
            *dst = src;
        }
        true
    }
}
