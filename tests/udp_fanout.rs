use std::time::Duration;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use gamelights::{
    color::{self, DeviceColor},
    dispatcher::{DispatchSettings, Dispatcher},
    generator::{ColorGenerator, GeneratorSettings},
    grabber::{Point, SolidGrabber},
    models,
    transport::Transport,
};

const PRIMARY: Point = Point::new(134, 59);
const SECONDARY: Point = Point::new(1706, 75);

async fn receivers(count: usize) -> (Vec<UdpSocket>, models::Output) {
    let mut sockets = Vec::new();
    let mut peers = Vec::new();

    for _ in 0..count {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        peers.push(socket.local_addr().unwrap().to_string());
        sockets.push(socket);
    }

    let output = models::Output {
        udp_peers: peers,
        ..Default::default()
    };

    (sockets, output)
}

async fn receive(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 64];
    let len = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("no datagram received")
        .unwrap();

    String::from_utf8(buf[..len].to_vec()).unwrap()
}

#[tokio::test]
async fn single_color_reaches_every_peer() {
    let (sockets, output) = receivers(3).await;

    let mut transport = Transport::from_config(&output, Duration::from_millis(100))
        .await
        .unwrap();
    let report = transport.send(color::parse_hex("#ff8000").unwrap()).await;
    assert_eq!(report.delivered, 3);
    assert_eq!(report.failed, 0);

    for socket in &sockets {
        assert_eq!(receive(socket).await, "255, 128, 0");
    }
}

#[tokio::test]
async fn dispatcher_forwards_captured_color() {
    let (sockets, output) = receivers(3).await;

    let transport = Transport::from_config(&output, Duration::from_millis(100))
        .await
        .unwrap();
    let grabber = SolidGrabber::default()
        .with(PRIMARY, DeviceColor::new(0, 0, 255))
        .with(SECONDARY, DeviceColor::new(215, 215, 215));

    let mut dispatcher = Dispatcher::new(
        Box::new(grabber),
        ColorGenerator::new(GeneratorSettings::default()).unwrap(),
        transport,
        (PRIMARY, SECONDARY),
        DispatchSettings::default(),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { dispatcher.run(cancel).await }
    });

    for socket in &sockets {
        assert_eq!(receive(socket).await, "0, 0, 255");
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let stats = handle.await.unwrap().unwrap();
    // The color never changes, so only the first tick is sent
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.suppressed, stats.ticks - 1);
    assert_eq!(stats.failed, 0);
}
