//! Integration tests for the framed stream transport against an
//! in-process fake service.

use std::time::Duration;

use sensorlink_protocol::{
    ControlTransport, MessageReceiver, MessageSender, ProtocolError, StreamConnection,
};
use sensorlink_types::{
    ChannelAddress, ControlReply, ControlRequest, ControlValue, Method, MethodCall, RemoteError,
};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

fn sensor_address() -> ChannelAddress {
    ChannelAddress::new("/SensorManager/accelerometersensor", "local.AccelerometerSensor")
}

/// Spawn a fake service answering requests on `stream`.
///
/// Every request is forwarded to the returned receiver. `bufferSize`
/// queries answer 16, `stop` fails, everything else answers `Unit`.
/// Replies are sent in reverse order of arrival for each pair of
/// requests so the client must correlate by serial.
fn spawn_service(stream: DuplexStream) -> mpsc::UnboundedReceiver<ControlRequest> {
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut rx = MessageReceiver::new(read_half);
        let mut tx = MessageSender::new(write_half);
        let mut deferred: Option<ControlReply> = None;

        while let Ok(Some(request)) = rx.recv::<ControlRequest>().await {
            let _ = seen_tx.send(request.clone());
            if !request.reply_expected {
                continue;
            }
            let reply = match request.call.method {
                Method::BufferSize => ControlReply::ok(request.serial, ControlValue::UInt(16)),
                Method::Stop => {
                    ControlReply::err(request.serial, RemoteError::new("Failed", "cannot stop"))
                }
                _ => ControlReply::ok(request.serial, ControlValue::Unit),
            };
            match deferred.take() {
                None => deferred = Some(reply),
                Some(earlier) => {
                    tx.send(&reply).await.unwrap();
                    tx.send(&earlier).await.unwrap();
                }
            }
        }
        if let Some(earlier) = deferred {
            let _ = tx.send(&earlier).await;
        }
    });
    seen_rx
}

#[tokio::test]
async fn replies_are_correlated_by_serial() {
    let (client, service) = tokio::io::duplex(4096);
    let mut seen = spawn_service(service);
    let connection = StreamConnection::from_stream(client);
    let transport = connection.transport(sensor_address());

    let stop = transport.issue(MethodCall::new(Method::Stop, vec![ControlValue::Int(3)]));
    let size = transport.issue(MethodCall::new(Method::BufferSize, vec![]));

    let size = tokio::time::timeout(Duration::from_secs(2), size.outcome())
        .await
        .unwrap();
    let stop = tokio::time::timeout(Duration::from_secs(2), stop.outcome())
        .await
        .unwrap();

    assert_eq!(size, Ok(ControlValue::UInt(16)));
    assert_eq!(stop.unwrap_err().message, "cannot stop");

    let first = seen.recv().await.unwrap();
    assert_eq!(first.target, sensor_address());
    assert_eq!(first.call.args, vec![ControlValue::Int(3)]);
}

#[tokio::test]
async fn notify_expects_no_reply() {
    let (client, service) = tokio::io::duplex(4096);
    let mut seen = spawn_service(service);
    let connection = StreamConnection::from_stream(client);
    let transport = connection.transport(sensor_address());

    transport.notify(MethodCall::new(
        Method::RemoveDataRangeRequest,
        vec![ControlValue::Int(5)],
    ));

    let request = tokio::time::timeout(Duration::from_secs(2), seen.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.call.method, Method::RemoveDataRangeRequest);
    assert!(!request.reply_expected);
}

#[tokio::test]
async fn closed_service_fails_pending_calls() {
    let (client, service) = tokio::io::duplex(4096);
    let connection = StreamConnection::from_stream(client);
    let transport = connection.transport(sensor_address());
    drop(service);

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        transport.call(MethodCall::bare(Method::Description)),
    )
    .await
    .unwrap();

    match result {
        Err(ProtocolError::Remote(e)) => assert_eq!(e, RemoteError::disconnected()),
        other => panic!("expected disconnect, got {other:?}"),
    }

    // The reader task notices EOF and invalidates the connection.
    tokio::time::timeout(Duration::from_secs(2), async {
        while transport.is_valid() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert!(!connection.is_valid());
}
