//! In-process HTTP responder for tests.
//!
//! Speaks just enough HTTP/1.1 for reqwest: one request per connection,
//! `Content-Length` bodies, `Connection: close` replies.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Recorded request
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// HTTP method
    pub method: String,
    /// Path including query string
    pub path: String,
    /// Raw body
    pub body: String,
}

impl MockRequest {
    /// Body parsed as JSON, null when it isn't
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Canned response
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code
    pub status: u16,
    /// Body
    pub body: String,
}

impl MockResponse {
    /// 200 with a JSON body
    pub fn json(value: Value) -> Self {
        Self {
            status: 200,
            body: value.to_string(),
        }
    }

    /// Arbitrary status and body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

type Handler = Arc<dyn Fn(&MockRequest) -> MockResponse + Send + Sync>;

/// HTTP server on an ephemeral localhost port
pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<MockRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Start answering every request with `handler`
    pub async fn start<F>(handler: F) -> std::io::Result<Self>
    where
        F: Fn(&MockRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let requests: Arc<Mutex<Vec<MockRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Arc::new(handler);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, handler, recorded).await {
                        tracing::debug!("mock connection error: {}", e);
                    }
                });
            }
        });

        Ok(Self {
            addr,
            requests,
            task,
        })
    }

    /// JSON-RPC 2.0 server.
    ///
    /// `handler(method, params)` returns the result, or `(code, message)`
    /// for an error object. The request id is echoed.
    pub async fn json_rpc<F>(handler: F) -> std::io::Result<Self>
    where
        F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
    {
        Self::start(move |request| {
            let body = request.json();
            let id = body.get("id").cloned().unwrap_or(Value::Null);
            let method = body.get("method").and_then(Value::as_str).unwrap_or("");
            let params = body.get("params").cloned().unwrap_or(Value::Null);

            let reply = match handler(method, &params) {
                Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err((code, message)) => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": code, "message": message}
                }),
            };
            MockResponse::json(reply)
        })
        .await
    }

    /// Base URL, no trailing slash
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: Handler,
    recorded: Arc<Mutex<Vec<MockRequest>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let path = request_line.next().unwrap_or("/").to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(body_start + content_length);
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).to_string();

    let request = MockRequest { method, path, body };
    recorded.lock().push(request.clone());
    let response = handler(&request);

    let reply = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason_phrase(response.status),
        response.body.len(),
        response.body
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
