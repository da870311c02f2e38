//! Local stand-in for the instance metadata service.
//!
//! Answers every request with the next scripted response; once the script is
//! exhausted the last response repeats. Paths of received requests are
//! recorded so tests can assert on what the client asked for.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// What the service returns for `spot/termination-time` when no notice exists.
    pub fn not_found() -> Self {
        Self::status(404, "404 - Not Found")
    }
}

pub struct MockMetadataServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl Drop for MockMetadataServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockMetadataServer {
    pub async fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            let mut served = 0usize;

            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };

                let Some(path) = read_request_path(&mut stream).await else {
                    continue;
                };
                // Record before replying so a client that saw the response
                // also sees its request in `requests()`.
                recorded.lock().await.push(path);

                let response = responses
                    .get(served.min(responses.len().saturating_sub(1)))
                    .cloned()
                    .unwrap_or_else(MockResponse::not_found);
                served += 1;

                write_response(&mut stream, &response).await;
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// Endpoint to hand to `MetadataClient::with_url`.
    pub fn url(&self) -> String {
        format!("http://{}/latest", self.addr)
    }

    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

async fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
}

async fn write_response(stream: &mut TcpStream, response: &MockResponse) {
    let reply = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason(response.status),
        response.body.len(),
        response.body
    );

    let _ = stream.write_all(reply.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
