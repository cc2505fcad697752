//! Resilient client engine for live fragmented-MP4 streams.
//!
//! A stream server pushes tagged binary frames over a persistent duplex
//! message connection: a codec announcement, then a metadata object and an
//! fMP4 fragment per media sample. wsmp4f demultiplexes those frames, feeds
//! the fragments to a playback sink that accepts one append at a time, and
//! transparently reconnects (rebuilding the sink) when the connection drops.
//!
//! # Architecture
//!
//! - [`transport`]: the duplex connection ([`Connector`], [`Transport`])
//! - [`demux`]: tag-byte frame classification
//! - [`queue`]: single-flight FIFO in front of the sink ([`AppendQueue`])
//! - [`sink`]: the host's output surface and sinks ([`OutputSurface`], [`AppendSink`])
//! - [`session`]: the supervised playback session ([`PlaybackSession`])
//! - [`LivePlayer`]: source switching over one surface
//!
//! Media is never decoded here. The host supplies the surface (a browser
//! `MediaSource`, a muxer, a recorder) and the transport.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use wsmp4f::transports::{ChannelConnector, FrameFeed};
//! use wsmp4f::{PlaybackSession, PlayerConfig, SessionState};
//! # use wsmp4f::{AppendNotifier, AppendSink, Codecs, OutputSurface};
//! # struct Headless;
//! # impl OutputSurface for Headless {
//! #     fn create_sink(&mut self, _: &Codecs, _: AppendNotifier) -> wsmp4f::Result<Box<dyn AppendSink>> {
//! #         Err(wsmp4f::PlayerError::unsupported_codec("", "headless"))
//! #     }
//! # }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> wsmp4f::Result<()> {
//!     let (connector, mut incoming) = ChannelConnector::new();
//!     let session = PlaybackSession::start(
//!         "ws://nvr.local/livestreams/cam-1/wsmp4f",
//!         connector,
//!         Headless,
//!         PlayerConfig::default(),
//!     )?;
//!
//!     // Bridge frames from your own socket into the session.
//!     if let Some(accepted) = incoming.accept().await {
//!         let feed: FrameFeed = accepted.feed;
//!         feed.send(wsmp4f::FrameTag::Codec.build(b"avc1.64001f"));
//!     }
//!
//!     assert_ne!(session.state(), SessionState::Destroyed);
//!     session.shutdown().await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod config;
mod error;
pub mod types;

// Frame protocol and append path
pub mod demux;
pub mod queue;
pub mod sink;
mod timer;

// Connections and supervision
pub mod session;
mod supervisor;
pub mod transport;
pub mod transports;

// UI-facing stream helpers
pub mod stream;

mod player;

#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Core exports
pub use config::PlayerConfig;
pub use error::*;
pub use types::*;

// Main API exports
pub use demux::{DemuxEvent, classify};
pub use player::LivePlayer;
pub use queue::AppendQueue;
pub use session::{PlaybackEvent, PlaybackSession};
pub use sink::{AppendCompletion, AppendNotifier, AppendOutcome, AppendSink, OutputSurface};
pub use timer::ReconnectTimer;
pub use transport::{Connector, Transport};
