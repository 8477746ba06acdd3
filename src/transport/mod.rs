//! Byte transport consumed by the axis clients.
//!
//! The link is half-duplex: exactly one request may be outstanding per bus.
//! Axes sharing a bus go through a [`SharedTransport`] and hold its lock for
//! the whole write/settle/read round trip.

pub mod config;
pub mod serial;
pub mod sim;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::Result;

#[async_trait::async_trait]
pub trait Transport: Send {
    async fn open(&mut self) -> Result<()>;
    async fn close(&mut self) -> Result<()>;
    fn is_open(&self) -> bool;

    /// Write one request, wait the settle delay, read one complete answer.
    ///
    /// Fails with [`ProtocolError::Timeout`](crate::error::ProtocolError::Timeout)
    /// when no complete answer arrives within `timeout`.
    async fn write_read(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>>;
}

/// Single-writer handle to a transport shared by several axes.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

pub fn shared<T: Transport + 'static>(transport: T) -> SharedTransport {
    Arc::new(Mutex::new(Box::new(transport)))
}

/// Open the transport unless another axis already did.
pub async fn ensure_open(transport: &SharedTransport) -> Result<()> {
    let mut guard = transport.lock().await;
    if !guard.is_open() {
        guard.open().await?;
    }
    Ok(())
}
