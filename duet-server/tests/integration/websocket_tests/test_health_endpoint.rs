use duet_core::{ClientMessage, RoomId, ServerMessage};
use duet_server::ServerConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::integration::init_tracing;
use crate::utils::{SIGNAL_TIMEOUT_MS, WsTestClient, spawn_server};

async fn get_health(addr: std::net::SocketAddr) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_health_reports_hub_sizes() {
    init_tracing();

    let addr = spawn_server(ServerConfig::default()).await;
    let mut c1 = WsTestClient::connect(addr).await.expect("connect c1");
    c1.send(ClientMessage::RoomJoin {
        identity: "a@x.com".to_owned(),
        room: RoomId::from("R"),
    })
    .await
    .unwrap();
    assert_eq!(
        c1.recv(SIGNAL_TIMEOUT_MS).await.unwrap(),
        ServerMessage::RoomUsers { users: vec![] }
    );

    let response = get_health(addr).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains(r#""identities":1"#), "{}", response);
    assert!(response.contains(r#""rooms":1"#), "{}", response);
}
