//! In-process servers for tests.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use surrealkit_protocol::{Decoder, RpcRequest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

/// A WebSocket RPC server that hands each accepted socket to the test.
pub(crate) struct MockServer {
    pub url: String,
    peers: mpsc::UnboundedReceiver<MockPeer>,
}

impl MockServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, peers) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                if tx.send(MockPeer { ws }).is_err() {
                    break;
                }
            }
        });

        Self {
            url: format!("ws://{}/rpc", addr),
            peers,
        }
    }

    /// Waits for the next client socket.
    pub async fn accept(&mut self) -> MockPeer {
        tokio::time::timeout(WAIT, self.peers.recv())
            .await
            .expect("no client connected")
            .expect("listener stopped")
    }
}

/// Server side of one client socket.
pub(crate) struct MockPeer {
    ws: WebSocketStream<TcpStream>,
}

impl MockPeer {
    /// Receives the next request.
    pub async fn recv(&mut self) -> RpcRequest {
        self.try_recv(WAIT).await.expect("timed out waiting for request")
    }

    /// Receives the next request, or `None` if nothing arrives within `wait`.
    pub async fn try_recv(&mut self, wait: Duration) -> Option<RpcRequest> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.ws.next()).await.ok()?;
            match frame {
                Some(Ok(Message::Text(text))) => return Some(Decoder::decode_request(&text).unwrap()),
                Some(Ok(_)) => continue,
                other => panic!("client socket ended: {:?}", other),
            }
        }
    }

    /// Answers both handshake steps with their expected acknowledgements.
    pub async fn complete_handshake(&mut self) -> (RpcRequest, RpcRequest) {
        let signin = self.recv().await;
        assert_eq!(signin.method.as_str(), "signin");
        self.reply(&signin.id, json!("")).await;

        let use_ns = self.recv().await;
        assert_eq!(use_ns.method.as_str(), "use");
        self.reply(&use_ns.id, Value::Null).await;

        (signin, use_ns)
    }

    pub async fn reply(&mut self, id: &str, result: Value) {
        self.send_json(json!({"id": id, "result": result})).await;
    }

    pub async fn reply_error(&mut self, id: &str, code: i64, message: &str) {
        self.send_json(json!({"id": id, "error": {"code": code, "message": message}}))
            .await;
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::Text(text.to_string())).await.unwrap();
    }

    /// Starts a close handshake with `code`.
    pub async fn close(&mut self, code: u16) {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: "".into(),
        };
        let _ = self.ws.close(Some(frame)).await;
    }
}

/// Serves exactly one HTTP request with a canned response.
///
/// Resolves to the raw request text once the response has been written.
pub(crate) async fn serve_http_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_http_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 {} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });

    (format!("http://{}", addr), handle)
}

async fn read_http_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before request head");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = std::str::from_utf8(&raw[..head_end]).unwrap().to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>().unwrap())
        .unwrap_or(0);

    while raw.len() < head_end + content_length {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed before request body");
        raw.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(raw).unwrap()
}
