//! One-shot HTTP server returning a canned response.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::endpoint::Endpoint;

/// Request as seen by the server.
pub(crate) struct Captured {
    pub request_line: String,
    pub body: serde_json::Value,
}

/// Serve one request, answering with `status` and `body`.
///
/// Returns the base endpoint (`http://127.0.0.1:<port>/api`) and a handle that
/// resolves to the captured request.
pub(crate) async fn serve_once(status: u16, body: &str) -> (Endpoint, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            assert!(n > 0, "connection closed before headers");
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        while raw.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before body");
            raw.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        Captured {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: serde_json::from_slice(&raw[header_end..header_end + content_length])
                .unwrap_or(serde_json::Value::Null),
        }
    });

    let endpoint = Endpoint::new(&format!("http://{addr}/api"), Duration::from_secs(5)).unwrap();
    (endpoint, handle)
}
