//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use least_conn_lb::{BalancerConfig, BalancerServer, ConnPool, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What a programmable backend does with one connection.
#[allow(dead_code)]
pub enum Reply {
    /// Answer with this status and body.
    Respond(u16, String),
    /// Read the request, then hang up without answering.
    Hangup,
    /// Hold the connection open without answering, then hang up.
    Stall(Duration),
    /// Answer 200 with the request head (lowercased) as the body.
    EchoHead,
}

/// Reserve a local port with nothing listening on it.
#[allow(dead_code)]
pub fn dead_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Read one request (headers plus Content-Length body) off the socket.
/// Returns the lowercased request head.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).to_ascii_lowercase(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return head;
            }
        }
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a simple mock backend that returns a fixed response.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { Reply::Respond(200, response.to_string()) }).await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_mock(listener, f);
    addr
}

/// Start a programmable backend on a specific address.
#[allow(dead_code)]
pub async fn start_programmable_backend_at<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_mock(listener, f);
}

async fn respond(socket: &mut TcpStream, status: u16, body: &str) {
    let response_str = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text(status),
        body.len(),
        body
    );
    let _ = socket.write_all(response_str.as_bytes()).await;
}

fn serve_mock<F, Fut>(listener: TcpListener, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply> + Send + 'static,
{
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_request(&mut socket).await;
                        match f().await {
                            Reply::Respond(status, body) => respond(&mut socket, status, &body).await,
                            Reply::EchoHead => respond(&mut socket, 200, &head).await,
                            Reply::Stall(hold) => tokio::time::sleep(hold).await,
                            Reply::Hangup => {}
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Config over the given backends with background loops pushed far out.
pub fn config_for(backends: &[SocketAddr]) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.hosts = backends.iter().map(|a| format!("http://{}", a)).collect();
    config.health_check.interval_secs = 3600;
    config.load_report.interval_secs = 3600;
    config.timeouts.forward_secs = 5;
    config
}

/// A running balancer bound to an ephemeral port.
pub struct RunningBalancer {
    pub addr: SocketAddr,
    pub pool: Arc<ConnPool>,
    pub shutdown: Shutdown,
}

impl RunningBalancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningBalancer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build the balancer from `config` and serve it in the background.
pub async fn start_balancer(config: BalancerConfig) -> RunningBalancer {
    let server = BalancerServer::from_config(config).unwrap();
    let pool = server.pool().clone();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    RunningBalancer {
        addr,
        pool,
        shutdown,
    }
}

/// Client without connection reuse or system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
