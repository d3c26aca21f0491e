// Local service liveness: can we open a TCP connection to it?

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Default connect timeout for the local probe
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

#[async_trait]
pub trait HealthCheck: Send + Sync + std::fmt::Debug {
    async fn is_healthy(&self) -> bool;
}

/// Connects to `addr` and hangs up without sending or reading anything.
#[derive(Debug, Clone)]
pub struct TcpHealthCheck {
    addr: SocketAddr,
    connect_timeout: Duration,
}

impl TcpHealthCheck {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl HealthCheck for TcpHealthCheck {
    async fn is_healthy(&self) -> bool {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!("Local endpoint {} refused: {}", self.addr, e);
                false
            }
            Err(_) => {
                debug!(
                    "Local endpoint {} timed out after {:?}",
                    self.addr, self.connect_timeout
                );
                false
            }
        }
    }
}

/// Fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticHealthCheck(pub bool);

#[async_trait]
impl HealthCheck for StaticHealthCheck {
    async fn is_healthy(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_port_is_healthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let check = TcpHealthCheck::new(listener.local_addr().unwrap());
        assert!(check.is_healthy().await);
    }

    #[tokio::test]
    async fn test_closed_port_is_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let check = TcpHealthCheck::new(addr).with_timeout(Duration::from_millis(500));
        assert!(!check.is_healthy().await);
    }
}
