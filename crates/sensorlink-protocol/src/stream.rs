//! Control transport over a framed byte stream.
//!
//! One [`StreamConnection`] multiplexes any number of
//! [`StreamControlTransport`]s (one per remote object) over a single
//! stream. A writer task drains the outbound queue so that issuing never
//! waits on the socket; a reader task routes replies to their pending
//! calls by serial.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sensorlink_types::{
    ChannelAddress, ControlReply, ControlRequest, ControlValue, MethodCall, RemoteError,
    PROTOCOL_VERSION,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::connection::{MessageReceiver, MessageSender};
use crate::error::ProtocolError;
use crate::transport::{ControlTransport, PendingReply};

type ReplySender = oneshot::Sender<Result<ControlValue, RemoteError>>;

struct Shared {
    outbound: mpsc::UnboundedSender<ControlRequest>,
    pending: Mutex<HashMap<u32, ReplySender>>,
    next_serial: AtomicU32,
    valid: AtomicBool,
}

impl Shared {
    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<u32, ReplySender>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the connection dead and fail every call still waiting.
    fn invalidate(&self) {
        self.valid.store(false, Ordering::SeqCst);
        let drained: Vec<ReplySender> = self.pending().drain().map(|(_, tx)| tx).collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "failing pending calls");
        }
        for tx in drained {
            let _ = tx.send(Err(RemoteError::disconnected()));
        }
    }

    fn complete(&self, reply: ControlReply) {
        let waiter = self.pending().remove(&reply.serial);
        match waiter {
            Some(tx) => {
                let _ = tx.send(reply.outcome);
            }
            None => debug!(serial = reply.serial, "reply for unknown serial"),
        }
    }
}

/// A framed connection to the sensor service.
#[derive(Clone)]
pub struct StreamConnection {
    shared: Arc<Shared>,
}

impl StreamConnection {
    /// Connect to the service's control socket.
    pub async fn connect_unix(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| ProtocolError::Connection(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "control channel connected");
        Ok(Self::from_stream(stream))
    }

    /// Run the protocol over an already connected stream.
    ///
    /// Spawns the reader and writer tasks, so this must be called from
    /// within a tokio runtime.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ControlRequest>();

        let shared = Arc::new(Shared {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_serial: AtomicU32::new(1),
            valid: AtomicBool::new(true),
        });

        let writer_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut sender = MessageSender::new(write_half);
            while let Some(request) = outbound_rx.recv().await {
                if let Err(e) = sender.send(&request).await {
                    warn!(error = %e, method = %request.call.method, "control write failed");
                    writer_shared.invalidate();
                    break;
                }
            }
        });

        let reader_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            let mut receiver = MessageReceiver::new(read_half);
            loop {
                match receiver.recv::<ControlReply>().await {
                    Ok(Some(reply)) => {
                        trace!(serial = reply.serial, "reply received");
                        reader_shared.complete(reply);
                    }
                    Ok(None) => {
                        info!("control channel closed by service");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "control read failed");
                        break;
                    }
                }
            }
            reader_shared.invalidate();
        });

        Self { shared }
    }

    /// Bind a transport to one remote object on this connection.
    pub fn transport(&self, address: ChannelAddress) -> StreamControlTransport {
        StreamControlTransport {
            shared: Arc::clone(&self.shared),
            address,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.shared.valid.load(Ordering::SeqCst)
    }
}

/// [`ControlTransport`] addressing one remote object over a
/// [`StreamConnection`].
pub struct StreamControlTransport {
    shared: Arc<Shared>,
    address: ChannelAddress,
}

impl StreamControlTransport {
    fn request(&self, call: MethodCall, reply_expected: bool) -> ControlRequest {
        ControlRequest {
            version: PROTOCOL_VERSION,
            serial: self.shared.next_serial.fetch_add(1, Ordering::Relaxed),
            target: self.address.clone(),
            call,
            reply_expected,
        }
    }
}

#[async_trait]
impl ControlTransport for StreamControlTransport {
    fn address(&self) -> &ChannelAddress {
        &self.address
    }

    fn issue(&self, call: MethodCall) -> PendingReply {
        if !self.is_valid() {
            return PendingReply::ready(Err(RemoteError::disconnected()));
        }

        let request = self.request(call, true);
        let serial = request.serial;
        let (tx, reply) = PendingReply::channel();
        self.shared.pending().insert(serial, tx);

        // The reader may have invalidated the connection between the check
        // above and the insert; in that case nobody will drain our entry.
        if !self.is_valid() || self.shared.outbound.send(request).is_err() {
            if let Some(tx) = self.shared.pending().remove(&serial) {
                let _ = tx.send(Err(RemoteError::disconnected()));
            }
        }
        reply
    }

    fn notify(&self, call: MethodCall) {
        let request = self.request(call, false);
        if self.shared.outbound.send(request).is_err() {
            debug!(address = %self.address, "notify dropped, control channel closed");
        }
    }

    async fn call(&self, call: MethodCall) -> Result<ControlValue, ProtocolError> {
        Ok(self.issue(call).outcome().await?)
    }

    fn is_valid(&self) -> bool {
        self.shared.valid.load(Ordering::SeqCst)
    }
}
