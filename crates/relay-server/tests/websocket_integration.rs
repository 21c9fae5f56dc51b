//! Integration tests for the WebSocket relay: a real server bound to an
//! ephemeral port, driven by real `tokio-tungstenite` clients end to end.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_core::Credentials;
use relay_server::{Server, ServerRuntimeConfig};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

async fn start_server(credentials: Credentials) -> (String, tokio::task::JoinHandle<()>) {
    let config = ServerRuntimeConfig { bind_address: "127.0.0.1:0".to_string() };
    let server = Server::bind(config, credentials).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, handle)
}

async fn connect(addr: &str) -> tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>> {
    let url = format!("ws://{addr}/");
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

async fn recv_binary(
    stream: &mut tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
) -> Vec<u8> {
    loop {
        match timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap().unwrap() {
            Message::Binary(bytes) => return bytes.to_vec(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn admission_assigns_user_id_over_real_socket() {
    let (addr, _handle) = start_server(Credentials::new(vec![])).await;
    let mut client = connect(&addr).await;

    client.send(Message::Binary(b"room".to_vec().into())).await.unwrap();
    let reply = recv_binary(&mut client).await;

    assert_eq!(reply.len(), 8);
    assert_ne!(u64::from_le_bytes(reply.try_into().unwrap()), 0);
}

#[tokio::test]
async fn private_message_reaches_only_the_addressed_peer() {
    let (addr, _handle) = start_server(Credentials::new(vec![])).await;

    let mut a = connect(&addr).await;
    a.send(Message::Binary(b"room".to_vec().into())).await.unwrap();
    let a_id = u64::from_le_bytes(recv_binary(&mut a).await.try_into().unwrap());

    let mut b = connect(&addr).await;
    b.send(Message::Binary(b"room2".to_vec().into())).await.unwrap();
    let b_id = u64::from_le_bytes(recv_binary(&mut b).await.try_into().unwrap());

    let mut frame = b_id.to_le_bytes().to_vec();
    frame.extend_from_slice(b"hi");
    a.send(Message::Binary(frame.into())).await.unwrap();

    let received = recv_binary(&mut b).await;
    assert_eq!(&received[..8], &a_id.to_le_bytes());
    assert_eq!(&received[8..], b"hi");
}

#[tokio::test]
async fn oversized_channel_name_is_closed_with_protocol_error() {
    let (addr, _handle) = start_server(Credentials::new(vec![])).await;
    let mut client = connect(&addr).await;

    client.send(Message::Binary(vec![0u8; 17].into())).await.unwrap();

    match timeout(Duration::from_secs(5), client.next()).await.unwrap().unwrap().unwrap() {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), 1002),
        other => panic!("expected a close frame, got {other:?}"),
    }
}

#[tokio::test]
async fn authenticate_with_wrong_password_does_not_unlock_relay_ops() {
    let (addr, _handle) = start_server(Credentials::new(vec![b"correct".to_vec()])).await;
    let mut client = connect(&addr).await;

    client.send(Message::Binary(b"re_globl".to_vec().into())).await.unwrap();
    recv_binary(&mut client).await;

    let mut auth = vec![0u8; 8];
    auth.push(0);
    auth.extend_from_slice(b"wrong");
    client.send(Message::Binary(auth.into())).await.unwrap();

    let mut census = vec![0u8; 8];
    census.push(2);
    client.send(Message::Binary(census.into())).await.unwrap();

    // Unauthenticated census requests are silently ignored; nothing else
    // should arrive within a short window.
    let outcome = timeout(Duration::from_millis(200), client.next()).await;
    assert!(outcome.is_err(), "expected no reply to an unauthenticated census request");
}
