//! Tiny HTTP/1.1 server for tests that need a real endpoint

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned response for one path (query strings are ignored when matching)
#[derive(Debug, Clone)]
pub struct Route {
    path: String,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Route {
    pub fn json(path: &str, body: &str) -> Self {
        Self::bytes(path, "application/json", body.as_bytes().to_vec())
    }

    pub fn bytes(path: &str, content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            path: path.to_string(),
            content_type,
            body,
        }
    }
}

/// A request as the server received it
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: String,
    pub body: String,
}

impl Request {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }
}

pub struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    /// Bind to an ephemeral port and serve `routes` until the test ends
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = routes.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    handle(stream, &routes, &log).await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests made for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path() == path).count()
    }
}

async fn handle(mut stream: TcpStream, routes: &[Route], log: &Mutex<Vec<Request>>) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };

    let route = routes.iter().find(|r| r.path == request.path());
    log.lock().unwrap().push(request);

    let (status, content_type, body) = match route {
        Some(route) => ("200 OK", route.content_type, route.body.clone()),
        None => ("404 Not Found", "text/plain", b"not found".to_vec()),
    };

    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&body).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let body_end = buf.len().min(header_end + content_length);

    Some(Request {
        method,
        target,
        headers: head,
        body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
    })
}
