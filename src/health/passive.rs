//! Passive health checking (reachability probe).
//!
//! # Responsibilities
//! - Dial a backend's `host:port` over TCP
//! - Bound every probe by a hard timeout
//!
//! # Design Decisions
//! - Reachability only; no HTTP request is sent
//! - The connection is closed as soon as it is established
//! - Timeouts and refusals are both failures

use std::time::Duration;

use tokio::net::TcpStream;

use crate::resilience::timeouts::with_deadline;

/// Why a backend failed its probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Unreachable(#[from] std::io::Error),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Try to open a TCP connection to `address` within `timeout`.
pub async fn probe(address: &str, timeout: Duration) -> Result<(), ProbeError> {
    let stream = with_deadline(timeout, TcpStream::connect(address))
        .await
        .map_err(|_| ProbeError::Timeout(timeout))??;
    drop(stream);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_port_passes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        assert!(probe(&addr, Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = probe(&addr, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Unreachable(_)));
    }

    #[tokio::test]
    async fn silent_port_times_out() {
        // Backlog of 1 and nobody accepting: once the queue is full, further
        // SYNs are dropped and the connect never completes.
        let socket = tokio::net::TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(1).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut held = Vec::new();
        for _ in 0..8 {
            if let Ok(Ok(stream)) =
                tokio::time::timeout(Duration::from_millis(100), TcpStream::connect(addr)).await
            {
                held.push(stream);
            }
        }

        let err = probe(&addr.to_string(), Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(_)));
        drop(listener);
    }
}
