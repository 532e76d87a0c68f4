#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub auth_header: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub retry_after: Option<u64>,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn error(code: &str) -> Self {
        Self::ok(format!(r#"{{"ok":false,"error":"{code}"}}"#))
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self {
            status: 429,
            retry_after: Some(retry_after_secs),
            body: r#"{"ok":false,"error":"ratelimited"}"#.to_string(),
        }
    }
}

/// Serves canned Slack API responses over a local listener; requests are
/// recorded for order and payload assertions. `finish()` shuts the accept
/// loop down with a sentinel request and returns the recording.
pub struct MockSlackServer {
    pub base_url: String,
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

const SHUTDOWN_PATH: &str = "/__shutdown";

impl MockSlackServer {
    pub fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let requests_for_thread = Arc::clone(&requests);
        let responder = Arc::new(responder);

        let handle = thread::spawn(move || loop {
            let (mut stream, _) = listener.accept().expect("accept");
            let request = read_request(&mut stream);
            if request.path.starts_with(SHUTDOWN_PATH) {
                write_response(&mut stream, &MockResponse::ok("{}"));
                break;
            }
            requests_for_thread
                .lock()
                .expect("lock requests")
                .push(request.clone());
            let response = responder(&request);
            write_response(&mut stream, &response);
        });

        Self {
            base_url: format!("http://{addr}"),
            addr,
            requests,
            handle: Some(handle),
        }
    }

    pub fn finish(mut self) -> Vec<RecordedRequest> {
        let mut stream = TcpStream::connect(self.addr).expect("connect for shutdown");
        let request =
            format!("GET {SHUTDOWN_PATH} HTTP/1.1\r\nHost: mock\r\nConnection: close\r\n\r\n");
        stream
            .write_all(request.as_bytes())
            .expect("write shutdown");
        let mut sink = String::new();
        let _ = stream.read_to_string(&mut sink);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("join mock server");
        }
        self.requests.lock().expect("lock requests").clone()
    }
}

fn read_request(stream: &mut TcpStream) -> RecordedRequest {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .expect("read request line");
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut auth_header = String::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read header");
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("authorization:") {
            auth_header = line
                .split_once(':')
                .map(|(_, v)| v.trim().to_string())
                .unwrap_or_default();
        }
        if lower.starts_with("content-length:") {
            content_length = line
                .split_once(':')
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
        }
    }

    let mut body = vec![0_u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).expect("read body");
    }

    RecordedRequest {
        path,
        auth_header,
        body: String::from_utf8_lossy(&body).to_string(),
    }
}

fn write_response(stream: &mut TcpStream, response: &MockResponse) {
    let retry_after = response
        .retry_after
        .map(|secs| format!("Retry-After: {secs}\r\n"))
        .unwrap_or_default();
    let payload = format!(
        "HTTP/1.1 {} MOCK\r\nContent-Type: application/json\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        retry_after,
        response.body.len(),
        response.body
    );
    stream
        .write_all(payload.as_bytes())
        .expect("write response");
}

/// Points the client at the mock server. Callers must hold `ENV_LOCK` for the
/// duration of the test.
pub fn set_env(base_url: &str) {
    std::env::set_var("CHANWARDEN_SLACK_API_BASE", format!("{base_url}/api"));
    std::env::set_var("SLACK_TOKEN", "xoxb-test");
}

pub static ENV_LOCK: Mutex<()> = Mutex::new(());
