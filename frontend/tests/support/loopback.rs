//! Minimal scripted HTTP/1.1 server on a loopback port.
//!
//! Each accepted connection reads one request, answers with the next
//! scripted response and closes. Captured requests are kept for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

/// One request as seen on the wire.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// `GET /admin/users?page=1 HTTP/1.1`.
    pub request_line: String,
    /// Header pairs with lower-cased names.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl CapturedRequest {
    /// First value of header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Request target: path plus query.
    pub fn target(&self) -> &str {
        self.request_line.split(' ').nth(1).unwrap_or_default()
    }
}

/// Scripted response.
#[derive(Debug, Clone)]
pub struct Scripted {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Scripted {
    /// Respond with `status` and a JSON `body`.
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_owned(),
        }
    }

    /// Respond with `status` and a plain-text `body`.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain;charset=UTF-8",
            body: body.to_owned(),
        }
    }
}

/// Running loopback server.
pub struct LoopbackServer {
    base: Url,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    task: JoinHandle<()>,
}

impl LoopbackServer {
    /// Bind to an ephemeral port and answer with `responses` in order.
    pub async fn start(responses: Vec<Scripted>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let address = listener.local_addr().expect("local address");
        let base = Url::parse(&format!("http://{address}/api")).expect("base url");
        let captured = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let task = tokio::spawn({
            let captured = Arc::clone(&captured);
            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let response = queue
                        .lock()
                        .expect("queue lock")
                        .pop_front()
                        .unwrap_or_else(|| Scripted::json(500, r#"{"message":"unscripted"}"#));
                    let captured = Arc::clone(&captured);
                    tokio::spawn(async move { answer(stream, &response, &captured).await });
                }
            }
        });

        Self {
            base,
            captured,
            task,
        }
    }

    /// Base URL including an `/api` prefix.
    pub fn base(&self) -> Url {
        self.base.clone()
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("capture lock").clone()
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(
    mut stream: TcpStream,
    response: &Scripted,
    captured: &Mutex<Vec<CapturedRequest>>,
) -> Option<()> {
    let request = read_request(&mut stream).await?;
    captured.lock().expect("capture lock").push(request);
    let reply = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.content_type,
        response.body.len(),
        response.body
    );
    stream.write_all(reply.as_bytes()).await.ok()?;
    stream.shutdown().await.ok()
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let head_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(chunk.get(..read)?);
        if let Some(position) = find_head_end(&buffer) {
            break position;
        }
    };

    let head = String::from_utf8_lossy(buffer.get(..head_end)?).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next()?.to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer.get(head_end + 4..)?.to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(chunk.get(..read)?);
    }

    Some(CapturedRequest {
        request_line,
        headers,
        body,
    })
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}
