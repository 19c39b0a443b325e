//! Readiness probe that checks the database address accepts TCP connections.

use std::time::Duration;

use async_trait::async_trait;
use bizkit_service_shared::{DependencyProbe, ProbeError};
use tokio::net::TcpStream;

#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DependencyProbe for TcpProbe {
    async fn ping(&self) -> Result<(), ProbeError> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Unreachable(format!("{}: {}", self.addr, e))),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_ping_listening_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(addr, Duration::from_secs(1));
        assert!(probe.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_closed_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpProbe::new(addr, Duration::from_secs(1));
        assert!(probe.ping().await.is_err());
    }
}
