//! Transport traits for duplex message connections

use bytes::Bytes;

use crate::Result;

/// One live duplex message connection
///
/// Transports know nothing about media. They hand inbound binary messages to
/// the supervisor one at a time, in order, and report closure.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next inbound frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - A frame arrived
    /// - `Ok(None)` - The connection closed cleanly
    /// - `Err(e)` - The connection failed
    ///
    /// Both `Ok(None)` and `Err` end the connection; the supervisor drops the
    /// transport afterwards and never polls it again.
    ///
    /// # Cancel safety
    ///
    /// Must be cancel safe. The supervisor races this future against stop,
    /// the reconnect timer and append completions, and drops it whenever one
    /// of those wins. A dropped call must not lose or split a frame: partial
    /// reads belong in `self`, not in locals of the future.
    async fn next_frame(&mut self) -> Result<Option<Bytes>>;

    /// Close the connection
    ///
    /// Must be idempotent. Frames still queued inside the transport are
    /// discarded.
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports to an endpoint URL
///
/// A successful `connect` is the transport's open event. An error is treated
/// like a close during connect: the supervisor schedules a reconnect.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new connection to `url`
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>>;
}
