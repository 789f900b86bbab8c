//! Integration tests for the Unix-socket data channel on a real socket.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sensorlink_data::{
    BatchDecoder, DataChannel, DataChannelError, DataSocket, FixedSizeDecoder, UnixDataSocket,
};
use sensorlink_types::SessionId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

static NEXT: AtomicUsize = AtomicUsize::new(0);

fn socket_path() -> PathBuf {
    let n = NEXT.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("sensorlink-data-{}-{n}.sock", std::process::id()))
}

/// Bind a listener, connect a channel to it and return the service side.
async fn connected_pair(session: SessionId) -> (DataChannel, UnixStream, PathBuf) {
    let path = socket_path();
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path).unwrap();

    let mut channel = DataChannel::new(Box::new(UnixDataSocket::new(&path)));
    let (opened, accepted) = tokio::join!(channel.open(session), listener.accept());
    opened.unwrap();
    let (mut service, _) = accepted.unwrap();

    let mut announced = [0u8; 4];
    service.read_exact(&mut announced).await.unwrap();
    assert_eq!(i32::from_le_bytes(announced), session.0);

    (channel, service, path)
}

async fn wait_readable(channel: &mut DataChannel) -> Result<(), DataChannelError> {
    tokio::time::timeout(Duration::from_secs(2), channel.readable())
        .await
        .expect("readiness timed out")
}

#[tokio::test]
async fn fixed_frames_drain_until_buffer_is_empty() {
    let (mut channel, mut service, path) = connected_pair(SessionId(7)).await;
    channel.subscribe();

    let frames: Vec<u8> = (0u8..4).flat_map(|i| [i; 8]).collect();
    service.write_all(&frames).await.unwrap();

    let records = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&records);
    let mut decoder = FixedSizeDecoder::new(8, move |rec: &[u8]| sink.borrow_mut().push(rec[0]));

    // Bytes may arrive in several chunks; keep draining until all four land.
    while records.borrow().len() < 4 {
        wait_readable(&mut channel).await.unwrap();
        channel.drain(&mut decoder);
    }

    assert_eq!(*records.borrow(), vec![0, 1, 2, 3]);
    assert_eq!(channel.bytes_available(), 0);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn batch_header_survives_split_body() {
    let (mut channel, mut service, path) = connected_pair(SessionId(3)).await;
    channel.subscribe();

    let mut batch = Vec::new();
    batch.extend_from_slice(&2u32.to_le_bytes());
    batch.extend_from_slice(&[0xAA; 6]);

    // Header plus half of the body.
    service.write_all(&batch[..7]).await.unwrap();
    wait_readable(&mut channel).await.unwrap();

    let mut records = Vec::new();
    let mut decoder = BatchDecoder::new(3, |rec: &[u8]| records.push(rec.to_vec()));
    channel.drain(&mut decoder);
    assert!(decoder.is_mid_batch());

    service.write_all(&batch[7..]).await.unwrap();
    while channel.bytes_available() < 6 {
        tokio::task::yield_now().await;
    }
    channel.drain(&mut decoder);
    assert!(!decoder.is_mid_batch());
    drop(decoder);

    assert_eq!(records, vec![vec![0xAA; 3], vec![0xAA; 3]]);
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn service_hangup_is_reported_as_closed() {
    let (mut channel, service, path) = connected_pair(SessionId(1)).await;
    channel.subscribe();
    drop(service);

    assert!(matches!(
        wait_readable(&mut channel).await,
        Err(DataChannelError::Closed)
    ));
    assert!(!channel.wants_readiness());
    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn connect_to_missing_socket_fails() {
    let mut socket = UnixDataSocket::new(socket_path());
    let result = socket.connect(SessionId(1)).await;
    assert!(matches!(result, Err(DataChannelError::Connect(_))));
    assert!(matches!(
        socket.disconnect().await,
        Err(DataChannelError::NotConnected)
    ));
}
