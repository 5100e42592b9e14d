//! Single TCP connection probe.
//!
//! A probe only establishes (and immediately drops) a connection; no bytes
//! are exchanged.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

/// Why a single probe did not succeed.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    /// Name resolution or connect failed (refused, unreachable, unknown host).
    #[error("connection failed: {0}")]
    Connect(#[from] io::Error),

    /// No answer within the connect timeout.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
}

/// Try to open a TCP connection to `address` (`host:port`).
///
/// The host is resolved on every call so that service names registered late
/// by the container network are picked up.
pub async fn probe_tcp(address: &str, connect_timeout: Duration) -> Result<(), ProbeFailure> {
    match time::timeout(connect_timeout, TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => Ok(()),
        Ok(Err(e)) => Err(ProbeFailure::Connect(e)),
        Err(_) => Err(ProbeFailure::Timeout(connect_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        probe_tcp(&addr.to_string(), Duration::from_secs(1))
            .await
            .expect("listening port should be reachable");
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let result = probe_tcp(&addr.to_string(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProbeFailure::Connect(_))));
    }
}
