//! End-to-end routing tests over real TCP connections
//!
//! Each test boots a relay on an ephemeral port, connects raw TCP clients,
//! and speaks the wire format directly: 4-byte little-endian length prefix,
//! 12-byte header, body.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use session_relay::config::ServerConfig;
use session_relay::service::server::RelayServer;

const MSG_PING: i32 = 0;
const MSG_HELLO: i32 = 1;
const MSG_TRANSFORM: i32 = 2;
const MSG_RPC: i32 = 5;

const SERVER_ID: i32 = 0;
const BROADCAST_ID: i32 = -1;

async fn start_relay() -> SocketAddr {
    start_relay_with(ServerConfig {
        address: String::from("127.0.0.1:0"),
        ..ServerConfig::default()
    })
    .await
}

async fn start_relay_with(config: ServerConfig) -> SocketAddr {
    let server = RelayServer::bind(config).await.expect("bind should succeed");
    let addr = server.local_addr().expect("bound address");
    tokio::spawn(server.run());
    addr
}

async fn write_frame(
    stream: &mut TcpStream,
    msg_id: i32,
    sender_id: i32,
    target_id: i32,
    body: &[u8],
) {
    let mut frame = BytesMut::with_capacity(16 + body.len());
    frame.put_i32_le((12 + body.len()) as i32);
    frame.put_i32_le(msg_id);
    frame.put_i32_le(sender_id);
    frame.put_i32_le(target_id);
    frame.put_slice(body);
    stream.write_all(&frame).await.expect("write should succeed");
}

/// Read one frame: `(msg_id, sender_id, target_id, body)`.
async fn read_frame(stream: &mut TcpStream) -> (i32, i32, i32, Vec<u8>) {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.expect("length prefix");
    let len = i32::from_le_bytes(prefix) as usize;
    assert!(len >= 12, "relay never emits short frames");

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.expect("payload");

    let msg_id = i32::from_le_bytes(payload[0..4].try_into().unwrap());
    let sender_id = i32::from_le_bytes(payload[4..8].try_into().unwrap());
    let target_id = i32::from_le_bytes(payload[8..12].try_into().unwrap());
    (msg_id, sender_id, target_id, payload[12..].to_vec())
}

/// Connect and consume the identity-assignment handshake.
async fn connect(addr: SocketAddr) -> (TcpStream, i32) {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let (msg_id, sender_id, target_id, body) = read_frame(&mut stream).await;

    assert_eq!(msg_id, MSG_HELLO);
    assert_eq!(sender_id, SERVER_ID);
    let assigned = i32::from_le_bytes(body[0..4].try_into().expect("4-byte hello body"));
    assert_eq!(target_id, assigned, "hello is addressed to the new session");

    (stream, assigned)
}

/// Assert no frame arrives within a grace window (connection stays open).
async fn assert_silence(stream: &mut TcpStream) {
    let mut byte = [0u8; 1];
    let result = timeout(Duration::from_millis(200), stream.read(&mut byte)).await;
    assert!(result.is_err(), "expected no data, got some");
}

fn rpc_body(net_id: i32, method: &str, arg_count: u8, args: &[u8]) -> Vec<u8> {
    let mut body = BytesMut::new();
    body.put_i32_le(net_id);
    body.put_i32_le(method.len() as i32);
    body.put_slice(method.as_bytes());
    body.put_u8(arg_count);
    body.put_slice(args);
    body.to_vec()
}

#[tokio::test]
async fn handshake_assigns_increasing_identities() {
    let addr = start_relay().await;

    let (_a, id_a) = connect(addr).await;
    let (_b, id_b) = connect(addr).await;

    assert_eq!(id_a, 100);
    assert_eq!(id_b, 101);
}

#[tokio::test]
async fn identities_survive_disconnects_without_reuse() {
    let addr = start_relay().await;

    let (a, id_a) = connect(addr).await;
    assert_eq!(id_a, 100);
    drop(a);
    sleep(Duration::from_millis(50)).await;

    let (_b, id_b) = connect(addr).await;
    assert_eq!(id_b, 101, "identities are never reused");
}

#[tokio::test]
async fn forged_sender_never_reaches_the_wire() {
    let addr = start_relay().await;
    let (mut a, id_a) = connect(addr).await;

    // Ping the server with a forged sender identity
    write_frame(&mut a, MSG_PING, 9999, SERVER_ID, b"").await;

    let (msg_id, sender_id, target_id, _body) = read_frame(&mut a).await;
    assert_eq!(msg_id, MSG_PING);
    assert_eq!(sender_id, SERVER_ID, "reply comes from the server identity");
    assert_eq!(target_id, id_a, "reply is addressed by assigned id, not the forgery");
}

#[tokio::test]
async fn ping_reply_echoes_body() {
    let addr = start_relay().await;
    let (mut a, _id_a) = connect(addr).await;

    write_frame(&mut a, MSG_PING, 0, SERVER_ID, b"t=1723").await;

    let (_msg_id, _sender_id, _target_id, body) = read_frame(&mut a).await;
    assert_eq!(body, b"t=1723");
}

#[tokio::test]
async fn broadcast_reaches_peers_but_not_sender() {
    let addr = start_relay().await;
    let (mut a, id_a) = connect(addr).await;
    let (mut b, _id_b) = connect(addr).await;

    write_frame(&mut a, MSG_TRANSFORM, 9999, BROADCAST_ID, b"x=1,y=2").await;

    let (msg_id, sender_id, target_id, body) = read_frame(&mut b).await;
    assert_eq!(msg_id, MSG_TRANSFORM);
    assert_eq!(sender_id, id_a, "peer sees the server-assigned origin");
    assert_eq!(target_id, BROADCAST_ID);
    assert_eq!(body, b"x=1,y=2");

    assert_silence(&mut a).await;
}

#[tokio::test]
async fn ping_broadcast_loops_back_to_sender() {
    let addr = start_relay().await;
    let (mut a, id_a) = connect(addr).await;
    let (mut b, _id_b) = connect(addr).await;

    write_frame(&mut a, MSG_PING, 0, BROADCAST_ID, b"").await;

    let (_, sender_a, _, _) = read_frame(&mut a).await;
    let (_, sender_b, _, _) = read_frame(&mut b).await;
    assert_eq!(sender_a, id_a, "ping relays include the originator");
    assert_eq!(sender_b, id_a);
}

#[tokio::test]
async fn unicast_routes_to_named_peer_only() {
    let addr = start_relay().await;
    let (mut a, id_a) = connect(addr).await;
    let (mut b, id_b) = connect(addr).await;
    let (mut c, _id_c) = connect(addr).await;

    write_frame(&mut a, MSG_TRANSFORM, 0, id_b, b"direct").await;

    let (msg_id, sender_id, target_id, body) = read_frame(&mut b).await;
    assert_eq!(msg_id, MSG_TRANSFORM);
    assert_eq!(sender_id, id_a);
    assert_eq!(target_id, id_b);
    assert_eq!(body, b"direct");

    assert_silence(&mut c).await;
}

#[tokio::test]
async fn unicast_to_departed_peer_is_silently_dropped() {
    let addr = start_relay().await;
    let (mut a, _id_a) = connect(addr).await;
    let (b, id_b) = connect(addr).await;

    drop(b);
    sleep(Duration::from_millis(50)).await;

    write_frame(&mut a, MSG_TRANSFORM, 0, id_b, b"anyone there?").await;
    assert_silence(&mut a).await;

    // The sender's connection is still fully functional
    write_frame(&mut a, MSG_PING, 0, SERVER_ID, b"").await;
    let (msg_id, _, _, _) = read_frame(&mut a).await;
    assert_eq!(msg_id, MSG_PING);
}

#[tokio::test]
async fn rpc_is_relayed_with_corrected_sender() {
    let addr = start_relay().await;
    let (mut a, id_a) = connect(addr).await;
    let (mut b, _id_b) = connect(addr).await;

    let body = rpc_body(7, "Fire", 0, b"");
    write_frame(&mut a, MSG_RPC, 9999, SERVER_ID, &body).await;

    let (msg_id, sender_id, target_id, relayed) = read_frame(&mut b).await;
    assert_eq!(msg_id, MSG_RPC);
    assert_eq!(sender_id, id_a);
    assert_eq!(target_id, BROADCAST_ID, "relay forces the broadcast target");
    assert_eq!(relayed, body, "the body is relayed untouched");

    assert_silence(&mut a).await;
}

#[tokio::test]
async fn malformed_rpc_is_dropped_without_killing_the_connection() {
    let addr = start_relay().await;
    let (mut a, _id_a) = connect(addr).await;
    let (mut b, _id_b) = connect(addr).await;

    // Method length claims far more bytes than the body holds
    let mut body = BytesMut::new();
    body.put_i32_le(7);
    body.put_i32_le(5000);
    body.put_slice(b"Fi");
    write_frame(&mut a, MSG_RPC, 0, SERVER_ID, &body).await;

    assert_silence(&mut b).await;

    write_frame(&mut a, MSG_PING, 0, SERVER_ID, b"").await;
    let (msg_id, _, _, _) = read_frame(&mut a).await;
    assert_eq!(msg_id, MSG_PING, "connection keeps working after a bad RPC");
}

#[tokio::test]
async fn short_frame_is_skipped_not_fatal() {
    let addr = start_relay().await;
    let (mut a, _id_a) = connect(addr).await;

    // A frame whose payload is shorter than the 12-byte header
    let mut frame = BytesMut::new();
    frame.put_i32_le(4);
    frame.put_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    a.write_all(&frame).await.unwrap();

    // The connection keeps reading subsequent frames
    write_frame(&mut a, MSG_PING, 0, SERVER_ID, b"").await;
    let (msg_id, _, _, _) = read_frame(&mut a).await;
    assert_eq!(msg_id, MSG_PING);
}

#[tokio::test]
async fn negative_length_prefix_ends_only_that_connection() {
    let addr = start_relay().await;
    let (mut a, _id_a) = connect(addr).await;
    let (mut b, id_b) = connect(addr).await;

    let mut frame = BytesMut::new();
    frame.put_i32_le(-1);
    frame.put_slice(&[0x00; 16]);
    a.write_all(&frame).await.unwrap();

    // The offender is disconnected...
    let mut byte = [0u8; 1];
    let read = timeout(Duration::from_secs(1), a.read(&mut byte))
        .await
        .expect("server should close the offending connection");
    assert_eq!(read.unwrap_or(0), 0, "expected closed connection");

    // ...while other sessions and the acceptor are unaffected
    write_frame(&mut b, MSG_PING, 0, SERVER_ID, b"").await;
    let (msg_id, _, target_id, _) = read_frame(&mut b).await;
    assert_eq!(msg_id, MSG_PING);
    assert_eq!(target_id, id_b);

    let (_c, id_c) = connect(addr).await;
    assert!(id_c > id_b);
}

#[tokio::test]
async fn connection_limit_refuses_excess_clients() {
    let addr = start_relay_with(ServerConfig {
        address: String::from("127.0.0.1:0"),
        max_connections: 1,
        ..ServerConfig::default()
    })
    .await;

    let (mut a, _id_a) = connect(addr).await;

    // Second client is closed before any handshake
    let mut refused = TcpStream::connect(addr).await.expect("tcp connect itself succeeds");
    let mut byte = [0u8; 1];
    let read = timeout(Duration::from_secs(1), refused.read(&mut byte))
        .await
        .expect("refused connection should be closed promptly");
    assert_eq!(read.unwrap_or(0), 0, "expected closed connection");

    // The admitted session is unaffected
    write_frame(&mut a, MSG_PING, 0, SERVER_ID, b"").await;
    let (msg_id, _, _, _) = read_frame(&mut a).await;
    assert_eq!(msg_id, MSG_PING);
}

#[tokio::test]
async fn broadcast_skips_departed_peer_and_reaches_the_rest() {
    let addr = start_relay().await;
    let (mut a, id_a) = connect(addr).await;
    let (b, _id_b) = connect(addr).await;
    let (mut c, _id_c) = connect(addr).await;

    drop(b);
    sleep(Duration::from_millis(50)).await;

    write_frame(&mut a, MSG_TRANSFORM, 0, BROADCAST_ID, b"still here").await;

    let (msg_id, sender_id, _, body) = read_frame(&mut c).await;
    assert_eq!(msg_id, MSG_TRANSFORM);
    assert_eq!(sender_id, id_a);
    assert_eq!(body, b"still here");
}
