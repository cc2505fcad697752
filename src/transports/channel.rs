//! In-process channel transport
//!
//! Lets the host application bridge any message connection it already owns
//! (a browser WebSocket, an IPC pipe) into the playback engine. Every connect
//! attempt shows up on [`Incoming`] as an [`Accepted`] connection; the host
//! pushes frames into its [`FrameFeed`] and drops the feed to close it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::transport::{Connector, Transport};
use crate::{PlayerError, Result};

enum FeedItem {
    Frame(Bytes),
    Fail(String),
}

/// Connector handing out channel-backed transports
#[derive(Clone)]
pub struct ChannelConnector {
    attempts: mpsc::UnboundedSender<Accepted>,
    refusing: Arc<AtomicBool>,
}

/// Host side: receives one [`Accepted`] per connect attempt
pub struct Incoming {
    attempts: mpsc::UnboundedReceiver<Accepted>,
    refusing: Arc<AtomicBool>,
}

/// A connection the player opened
pub struct Accepted {
    /// URL the player asked for
    pub url: String,

    /// Feed for this connection's inbound frames
    pub feed: FrameFeed,
}

/// Host side of one connection
pub struct FrameFeed {
    tx: mpsc::UnboundedSender<FeedItem>,
    closed: CancellationToken,
}

impl ChannelConnector {
    pub fn new() -> (Self, Incoming) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refusing = Arc::new(AtomicBool::new(false));
        let connector = Self { attempts: tx, refusing: Arc::clone(&refusing) };
        (connector, Incoming { attempts: rx, refusing })
    }
}

impl Incoming {
    /// Wait for the player's next connect attempt
    ///
    /// Returns `None` once every connector clone is gone.
    pub async fn accept(&mut self) -> Option<Accepted> {
        self.attempts.recv().await
    }

    /// Fail connect attempts while set, as if the endpoint were down
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }
}

impl FrameFeed {
    /// Deliver one frame; `false` if the player side is gone
    pub fn send(&self, frame: impl Into<Bytes>) -> bool {
        self.tx.send(FeedItem::Frame(frame.into())).is_ok()
    }

    /// End the connection with an error after already-sent frames
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.tx.send(FeedItem::Fail(reason.into())).is_ok()
    }

    /// Whether the player closed or dropped the transport
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    /// Wait until the player closes or drops the transport
    pub async fn closed(&self) {
        tokio::select! {
            _ = self.closed.cancelled() => {}
            _ = self.tx.closed() => {}
        }
    }
}

struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<FeedItem>,
    closed: CancellationToken,
}

#[async_trait::async_trait]
impl Transport for ChannelTransport {
    async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.closed.is_cancelled() {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(FeedItem::Frame(frame)) => Ok(Some(frame)),
            Some(FeedItem::Fail(reason)) => Err(PlayerError::transport_failed(reason)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed.is_cancelled() {
            debug!("Closing channel transport");
            self.closed.cancel();
            self.rx.close();
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(PlayerError::transport_failed(format!("{url}: connection refused")));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let closed = CancellationToken::new();
        let accepted =
            Accepted { url: url.to_string(), feed: FrameFeed { tx, closed: closed.clone() } };

        self.attempts
            .send(accepted)
            .map_err(|_| PlayerError::transport_failed(format!("{url}: no listener")))?;

        Ok(Box::new(ChannelTransport { rx, closed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_flow_until_feed_dropped() {
        let (connector, mut incoming) = ChannelConnector::new();
        let mut transport = connector.connect("ws://camera/1").await.unwrap();
        let accepted = incoming.accept().await.unwrap();
        assert_eq!(accepted.url, "ws://camera/1");

        assert!(accepted.feed.send(vec![1u8, 2, 3]));
        drop(accepted);

        assert_eq!(transport.next_frame().await.unwrap(), Some(Bytes::from_static(&[1, 2, 3])));
        assert_eq!(transport.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn fail_surfaces_as_transport_error() {
        let (connector, mut incoming) = ChannelConnector::new();
        let mut transport = connector.connect("ws://camera/1").await.unwrap();
        let accepted = incoming.accept().await.unwrap();

        accepted.feed.fail("reset");
        assert!(matches!(transport.next_frame().await, Err(PlayerError::Transport { .. })));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_visible_to_feed() {
        let (connector, mut incoming) = ChannelConnector::new();
        let mut transport = connector.connect("ws://camera/1").await.unwrap();
        let accepted = incoming.accept().await.unwrap();

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        accepted.feed.closed().await;

        assert!(accepted.feed.is_closed());
        assert!(!accepted.feed.send(vec![0u8]));
        assert_eq!(transport.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn refusing_fails_connect() {
        let (connector, incoming) = ChannelConnector::new();
        incoming.set_refusing(true);
        assert!(connector.connect("ws://camera/1").await.is_err());

        incoming.set_refusing(false);
        assert!(connector.connect("ws://camera/1").await.is_ok());
    }
}
