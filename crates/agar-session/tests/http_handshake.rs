//! Integration tests for the HTTP handshake.
//!
//! A bare TCP listener plays the master server: it reads one HTTP
//! request and answers with a canned body, so the tests exercise the
//! real `reqwest` path without any external network.

use agar_session::{
    Handshake, HandshakeConfig, HttpHandshake, ServerEndpoint, SessionError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves one request with `status` and `body`; returns the base URL and a
/// handle resolving to the raw request text.
async fn serve_once(
    status: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });

    (format!("http://{addr}/"), handle)
}

/// Reads headers plus a `Content-Length` body.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

#[tokio::test]
async fn test_http_handshake_parses_endpoint_and_token() {
    let (url, server) = serve_once("200 OK", "127.0.0.1:1503\nabc123\n").await;
    let hs = HttpHandshake::new(HandshakeConfig {
        url,
        ..HandshakeConfig::default()
    });

    let info = hs.perform().await.expect("handshake should succeed");
    assert_eq!(info.endpoint, ServerEndpoint::new("127.0.0.1", 1503));
    assert_eq!(info.token.as_str(), "abc123");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST / HTTP/1.1"));
}

#[tokio::test]
async fn test_http_handshake_sends_region_body() {
    let (url, server) = serve_once("200 OK", "127.0.0.1:1503\nabc123\n").await;
    let hs = HttpHandshake::new(HandshakeConfig {
        url,
        region: Some("EU-London".into()),
        server_version: 7,
    });

    hs.perform().await.expect("handshake should succeed");
    let request = server.await.unwrap();
    assert!(request.ends_with("EU-London\n7"), "request was {request:?}");
}

#[tokio::test]
async fn test_http_handshake_malformed_endpoint() {
    let (url, _server) = serve_once("200 OK", "not-an-endpoint\ntoken\n").await;
    let hs = HttpHandshake::new(HandshakeConfig {
        url,
        ..HandshakeConfig::default()
    });

    let err = hs.perform().await.unwrap_err();
    assert!(matches!(err, SessionError::Handshake(_)), "got {err:?}");
}

#[tokio::test]
async fn test_http_handshake_error_status() {
    let (url, _server) = serve_once("503 Service Unavailable", "").await;
    let hs = HttpHandshake::new(HandshakeConfig {
        url,
        ..HandshakeConfig::default()
    });

    let err = hs.perform().await.unwrap_err();
    assert!(matches!(err, SessionError::Http(_)), "got {err:?}");
}
