//! Mock data socket for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sensorlink_types::SessionId;
use tokio::sync::Notify;

use crate::error::DataChannelError;
use crate::DataSocket;

#[derive(Debug, Default)]
struct MockSocketState {
    buffer: VecDeque<u8>,
    fresh: bool,
    session: Option<SessionId>,
    connects: usize,
    disconnects: usize,
    fail_connect: bool,
    fail_disconnect: bool,
    closed: bool,
}

/// Mock data socket backed by an in-memory buffer.
///
/// Tests push bytes through the [`MockSocketHandle`] returned by
/// [`MockDataSocket::new`]; every push wakes a pending `readable()`.
pub struct MockDataSocket {
    state: Arc<Mutex<MockSocketState>>,
    wake: Arc<Notify>,
}

impl MockDataSocket {
    /// Create a new mock socket and a handle for feeding and observing it.
    pub fn new() -> (Self, MockSocketHandle) {
        let state = Arc::new(Mutex::new(MockSocketState::default()));
        let wake = Arc::new(Notify::new());
        let handle = MockSocketHandle {
            state: Arc::clone(&state),
            wake: Arc::clone(&wake),
        };
        (Self { state, wake }, handle)
    }
}

/// Clonable feed/observer handle for [`MockDataSocket`].
#[derive(Clone)]
pub struct MockSocketHandle {
    state: Arc<Mutex<MockSocketState>>,
    wake: Arc<Notify>,
}

impl MockSocketHandle {
    /// Append bytes as if the service had written them.
    pub fn feed(&self, bytes: &[u8]) {
        {
            let mut state = self.state.lock().unwrap();
            state.buffer.extend(bytes);
            state.fresh = true;
        }
        self.wake.notify_one();
    }

    /// Simulate the service hanging up.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.wake.notify_one();
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().unwrap().fail_connect = fail;
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.state.lock().unwrap().fail_disconnect = fail;
    }

    /// Session announced by the last successful connect.
    pub fn session(&self) -> Option<SessionId> {
        self.state.lock().unwrap().session
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    /// Bytes not yet read by the client.
    pub fn buffered(&self) -> usize {
        self.state.lock().unwrap().buffer.len()
    }
}

#[async_trait]
impl DataSocket for MockDataSocket {
    async fn connect(&mut self, session_id: SessionId) -> Result<(), DataChannelError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(DataChannelError::Connect("mock refused".to_string()));
        }
        state.session = Some(session_id);
        state.connects += 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DataChannelError> {
        let mut state = self.state.lock().unwrap();
        state.disconnects += 1;
        if state.fail_disconnect {
            return Err(DataChannelError::Disconnect("mock refused".to_string()));
        }
        state.session = None;
        Ok(())
    }

    async fn readable(&mut self) -> Result<(), DataChannelError> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if std::mem::take(&mut state.fresh) {
                    return Ok(());
                }
                if state.closed {
                    return Err(DataChannelError::Closed);
                }
            }
            self.wake.notified().await;
        }
    }

    fn bytes_available(&mut self) -> usize {
        self.state.lock().unwrap().buffer.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.buffer.len() < buf.len() {
            return false;
        }
        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(state.buffer.drain(..n)) {
            *dst = src;
        }
        true
    }
}
