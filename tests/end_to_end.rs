use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use kvserve::{Config, MemoryStore, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl Running {
    async fn start() -> Result<Self> {
        let config = Config {
            server_addr: "127.0.0.1:0".to_string(),
            ..Config::default()
        };
        let server = Server::bind(&config, Arc::new(MemoryStore::new())).await?;
        let addr = server.local_addr();

        let (stop, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));

        Ok(Self { addr, stop, handle })
    }

    async fn shutdown(self) -> Result<()> {
        let _ = self.stop.send(());
        self.handle.await??;
        Ok(())
    }
}

struct HttpResponse {
    status: u16,
    body: Vec<u8>,
}

/// Send one HTTP/1.1 request on a fresh connection and read until close
async fn request(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> Result<HttpResponse> {
    let mut stream = TcpStream::connect(addr).await?;
    let head = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        method,
        path,
        addr,
        body.len()
    );
    stream.write_all(head.as_bytes()).await?;
    stream.write_all(body).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    parse_response(&raw)
}

fn parse_response(raw: &[u8]) -> Result<HttpResponse> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or_else(|| anyhow!("no header terminator in response"))?;
    let head = std::str::from_utf8(&raw[..split])?;
    let status = head
        .split_whitespace()
        .nth(1)
        .context("missing status code")?
        .parse()?;

    let chunked = head
        .lines()
        .any(|line| line.eq_ignore_ascii_case("transfer-encoding: chunked"));
    let payload = &raw[split + 4..];
    let body = if chunked {
        dechunk(payload)?
    } else {
        payload.to_vec()
    };

    Ok(HttpResponse { status, body })
}

fn dechunk(mut data: &[u8]) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    loop {
        let line_end = data
            .windows(2)
            .position(|w| w == b"\r\n")
            .context("truncated chunk size")?;
        let size = usize::from_str_radix(std::str::from_utf8(&data[..line_end])?.trim(), 16)?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        body.extend_from_slice(&data[..size]);
        data = &data[size + 2..];
    }
}

#[tokio::test]
async fn put_get_delete_end_to_end() -> Result<()> {
    let server = Running::start().await?;

    let response = request(server.addr, "PUT", "/alpha", b"hello").await?;
    assert_eq!(response.status, 200);

    let response = request(server.addr, "GET", "/alpha", b"").await?;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"hello");

    let response = request(server.addr, "DELETE", "/alpha", b"").await?;
    assert_eq!(response.status, 200);

    let response = request(server.addr, "GET", "/alpha", b"").await?;
    assert_eq!(response.status, 404);
    let message: serde_json::Value = serde_json::from_slice(&response.body)?;
    assert_eq!(message["message"], "No such key alpha");

    let response = request(server.addr, "DELETE", "/alpha", b"").await?;
    assert_eq!(response.status, 404);

    server.shutdown().await
}

#[tokio::test]
async fn list_keys_end_to_end() -> Result<()> {
    let server = Running::start().await?;

    let response = request(server.addr, "GET", "/", b"").await?;
    assert_eq!(response.status, 200);
    let keys: Vec<String> = serde_json::from_slice(&response.body)?;
    assert!(keys.is_empty());

    request(server.addr, "PUT", "/a", b"1").await?;
    request(server.addr, "PUT", "/b", b"").await?;

    let response = request(server.addr, "GET", "/", b"").await?;
    assert_eq!(response.status, 200);
    let mut keys: Vec<String> = serde_json::from_slice(&response.body)?;
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

    let response = request(server.addr, "GET", "/b", b"").await?;
    assert_eq!(response.status, 200);
    assert!(response.body.is_empty());

    server.shutdown().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_end_to_end() -> Result<()> {
    let server = Running::start().await?;
    let addr = server.addr;

    let values: Vec<Vec<u8>> = (0..8u8).map(|i| vec![b'a' + i; 2048]).collect();
    let tasks: Vec<_> = values
        .iter()
        .cloned()
        .map(|value| tokio::spawn(async move { request(addr, "PUT", "/shared", &value).await }))
        .collect();

    for result in futures::future::join_all(tasks).await {
        assert_eq!(result??.status, 200);
    }

    let response = request(addr, "GET", "/shared", b"").await?;
    assert_eq!(response.status, 200);
    assert!(values.contains(&response.body));

    server.shutdown().await
}

#[tokio::test]
async fn unroutable_requests_end_to_end() -> Result<()> {
    let server = Running::start().await?;

    for (method, path) in [("PUT", "/"), ("DELETE", "/"), ("POST", "/alpha")] {
        let response = request(server.addr, method, path, b"x").await?;
        assert_eq!(response.status, 404, "{} {}", method, path);
        let message: serde_json::Value = serde_json::from_slice(&response.body)?;
        assert_eq!(message["message"], "not found");
    }

    server.shutdown().await
}
