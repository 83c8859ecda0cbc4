use anyhow::Result;
use async_trait::async_trait;

/// Factory for logical WebSocket connections.
///
/// The session owns the connection exclusively; no other component ever
/// holds a reference to the raw transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>>;
}

/// One open text-frame connection.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, frame: &str) -> Result<()>;

    /// Next inbound text frame. `None` means the transport closed; an `Err`
    /// is a transport-level failure that also ends the connection.
    async fn recv_text(&mut self) -> Option<Result<String>>;

    async fn close(&mut self);
}
