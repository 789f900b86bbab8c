//! Stream framing over async byte streams.

use std::io::ErrorKind;

use bincode::{Decode, Encode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::ProtocolError;
use crate::wire::{decode_payload, encode_frame, payload_len, HEADER_LEN};

/// Writing side of a framed control stream.
pub struct MessageSender<W> {
    stream: W,
}

impl<W: AsyncWrite + Unpin> MessageSender<W> {
    pub fn new(stream: W) -> Self {
        Self { stream }
    }

    /// Write one frame and flush it.
    pub async fn send<T: Encode>(&mut self, msg: &T) -> Result<(), ProtocolError> {
        let frame = encode_frame(msg)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        trace!(payload = frame.len() - HEADER_LEN, "frame sent");
        Ok(())
    }

    /// Close the write direction.
    pub async fn finish(mut self) -> Result<(), ProtocolError> {
        Ok(self.stream.shutdown().await?)
    }
}

/// Reading side of a framed control stream.
pub struct MessageReceiver<R> {
    stream: R,
}

impl<R: AsyncRead + Unpin> MessageReceiver<R> {
    pub fn new(stream: R) -> Self {
        Self { stream }
    }

    /// Read the next frame.
    ///
    /// `Ok(None)` means the peer closed the stream between frames; closing
    /// inside a frame is [`ProtocolError::StreamClosed`].
    pub async fn recv<T: Decode<()>>(&mut self) -> Result<Option<T>, ProtocolError> {
        let mut header = [0u8; HEADER_LEN];
        match self.stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut payload = vec![0u8; payload_len(header)?];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => ProtocolError::StreamClosed,
                _ => e.into(),
            })?;

        trace!(payload = payload.len(), "frame received");
        decode_payload(&payload).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlink_types::{ControlReply, ControlValue};

    #[tokio::test]
    async fn frames_survive_a_duplex_pipe() {
        let (a, b) = tokio::io::duplex(256);
        let mut tx = MessageSender::new(a);
        let mut rx = MessageReceiver::new(b);

        tx.send(&ControlReply::ok(1, ControlValue::UInt(20))).await.unwrap();
        tx.send(&ControlReply::ok(2, ControlValue::Bool(false))).await.unwrap();
        tx.finish().await.unwrap();

        let first: ControlReply = rx.recv().await.unwrap().unwrap();
        let second: ControlReply = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.outcome, Ok(ControlValue::UInt(20)));
        assert_eq!(second.serial, 2);
        let end: Option<ControlReply> = rx.recv().await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        let mut rx = MessageReceiver::new(b);
        a.write_all(&(crate::wire::MAX_MESSAGE_SIZE + 1).to_be_bytes()).await.unwrap();

        let result: Result<Option<ControlReply>, _> = rx.recv().await;
        assert!(matches!(result, Err(ProtocolError::Deserialization(_))));
    }
}
