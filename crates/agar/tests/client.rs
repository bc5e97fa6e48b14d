//! Integration tests for the client dispatch loop.
//!
//! Most tests drive the client over plain packet queues. The last one
//! runs a whole session against a local tokio-tungstenite server.

use std::time::Duration;

use agar::prelude::*;
use agar::transport::{packet_queue, PacketReceiver, PacketSender};
use agar::session::StaticHandshake;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

fn config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_millis(20),
        ..ClientConfig::default()
    }
}

/// A client plus the far ends of its queues.
fn client() -> (AgarClient, PacketReceiver, PacketSender) {
    let (out_tx, out_rx) = packet_queue();
    let (in_tx, in_rx) = packet_queue();
    (AgarClient::new(out_tx, in_rx, config()), out_rx, in_tx)
}

fn bounds_packet(b: [f64; 4]) -> Packet {
    Packet::new(64, b.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<_>>())
}

/// A `WorldUpdate` carrying one record for `id` named "bot".
fn update_packet(id: u32) -> Packet {
    let mut p = Vec::new();
    p.extend(0u16.to_le_bytes());
    p.extend(id.to_le_bytes());
    p.extend(100u32.to_le_bytes());
    p.extend(200u32.to_le_bytes());
    p.extend(50u16.to_le_bytes());
    p.extend([1, 2, 3, 0]);
    p.extend(3u16.to_le_bytes());
    p.extend(b"bot");
    p.extend(0u32.to_le_bytes());
    p.extend(0u32.to_le_bytes());
    Packet::new(16, p)
}

async fn next_packet(rx: &mut PacketReceiver) -> Packet {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("no packet")
        .expect("queue closed")
}

/// Polls `check` until it holds or the wait runs out.
async fn eventually(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "condition never held");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ---------------------------------------------------------------------------
// Queue-level
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_initialization_packets_in_order() {
    let (client, mut out, _in) = client();

    client
        .start_initialization(&ConnectionToken::new("abc"))
        .unwrap();

    assert_eq!(next_packet(&mut out).await.frame(), vec![254, 5, 0, 0, 0]);
    assert_eq!(
        next_packet(&mut out).await.frame(),
        [vec![255], 154_669_603u32.to_le_bytes().to_vec()].concat()
    );
    assert_eq!(next_packet(&mut out).await.frame(), b"\x50abc".to_vec());
    assert!(out.try_recv().is_none());
}

#[tokio::test]
async fn test_commands_forwarded_in_submission_order() {
    let (client, mut out, _in) = client();
    client.start_processing_loop().unwrap();

    client.submit(Command::Split).unwrap();
    client.submit(Command::Q).unwrap();
    client.submit(Command::EjectMass).unwrap();

    for opcode in [17, 18, 21] {
        assert_eq!(next_packet(&mut out).await.opcode(), opcode);
    }
    client.stop_processing_loop().await;
}

#[tokio::test]
async fn test_commands_wait_for_processing_loop() {
    let (client, mut out, _in) = client();
    client.submit(Command::Spectate).unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(out.try_recv().is_none());

    client.start_processing_loop().unwrap();
    assert_eq!(next_packet(&mut out).await.opcode(), 1);
    client.stop_processing_loop().await;
}

#[tokio::test]
async fn test_inbound_packets_update_world() {
    let (client, _out, inbound) = client();
    client.start_processing_loop().unwrap();
    let world = client.world();

    inbound.send(bounds_packet([-10.0, -10.0, 10.0, 10.0])).unwrap();
    inbound.send(update_packet(7)).unwrap();
    inbound.send(Packet::new(32, 7u32.to_le_bytes())).unwrap();

    eventually(|| world.owned_ids() == vec![7]).await;
    assert_eq!(world.bounds().unwrap().width(), 20.0);
    assert_eq!(world.entity(7).unwrap().name, "bot");
    client.stop_processing_loop().await;
}

#[tokio::test]
async fn test_bad_packets_do_not_stop_the_loop() {
    let (client, _out, inbound) = client();
    client.start_processing_loop().unwrap();
    let world = client.world();

    inbound.send(Packet::new(64, [0u8; 8])).unwrap();
    inbound.send(Packet::new(16, [1u8])).unwrap();
    inbound.send(Packet::empty(99)).unwrap();
    inbound.send(update_packet(3)).unwrap();

    eventually(|| world.entity_count() == 1).await;
    assert!(world.bounds().is_none());
    assert!(client.is_running());
    client.stop_processing_loop().await;
}

#[tokio::test]
async fn test_processing_loop_lifecycle() {
    let (client, mut out, _in) = client();

    client.start_processing_loop().unwrap();
    assert!(matches!(
        client.start_processing_loop(),
        Err(ClientError::AlreadyRunning)
    ));

    client.stop_processing_loop().await;
    client.stop_processing_loop().await;
    assert!(!client.is_running());

    // Restartable: the queues come back when the loop exits.
    client.start_processing_loop().unwrap();
    client.submit(Command::Afk).unwrap();
    assert_eq!(next_packet(&mut out).await.opcode(), 19);
    client.stop_processing_loop().await;
}

#[test]
fn test_attach_takes_inbound_once() {
    let info = SessionInfo {
        endpoint: ServerEndpoint::new("127.0.0.1", 1),
        token: ConnectionToken::new("t"),
    };
    let manager = TransportManager::new(StaticHandshake(info), TransportConfig::default());

    assert!(AgarClient::attach(&manager, ClientConfig::default()).is_ok());
    assert!(matches!(
        AgarClient::attach(&manager, ClientConfig::default()),
        Err(ClientError::InboundTaken)
    ));
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_full_session_against_local_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = ServerEndpoint::new("127.0.0.1", listener.local_addr().unwrap().port());
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    });

    let info = SessionInfo {
        endpoint,
        token: ConnectionToken::new("tok"),
    };
    let manager = TransportManager::new(
        StaticHandshake(info),
        TransportConfig {
            poll_interval: Duration::from_millis(20),
            ..TransportConfig::default()
        },
    );
    let client = AgarClient::attach(&manager, config()).unwrap();

    manager.start().await.unwrap();
    let mut ws = server.await.unwrap();
    client.start_processing_loop().unwrap();

    let token = manager.session().unwrap().token.clone();
    client.start_initialization(&token).unwrap();
    client
        .submit(Command::SetDirection { x: 1.0, y: 2.0 })
        .unwrap();

    let mut opcodes = Vec::new();
    while opcodes.len() < 4 {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let Message::Binary(data) = msg {
            opcodes.push(data[0]);
        }
    }
    assert_eq!(opcodes, vec![254, 255, 80, 16]);

    ws.send(Message::Binary(bounds_packet([0.0, 0.0, 6000.0, 6000.0]).frame().into()))
        .await
        .unwrap();
    ws.send(Message::Binary(update_packet(42).frame().into()))
        .await
        .unwrap();

    let world = client.world();
    eventually(|| world.entity_count() == 1).await;
    assert_eq!(world.bounds().unwrap().height(), 6000.0);

    client.stop_processing_loop().await;
    manager.stop().await.unwrap();
}
