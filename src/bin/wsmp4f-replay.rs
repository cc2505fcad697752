//! Replay a recorded wsmp4f capture through a playback session.
//!
//! Usage: `wsmp4f-replay <capture> [config.yaml]`
//!
//! Fragments are accepted by a surface that discards them after counting,
//! so the tool is useful for checking captures and watching the session's
//! reconnect behaviour (a capture that ends is treated as a dropped
//! connection and replayed again after the reconnect delay). Set `RUST_LOG`
//! to adjust verbosity.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, bail};
use bytes::Bytes;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wsmp4f::transports::ReplayConnector;
use wsmp4f::{
    AppendNotifier, AppendSink, Codecs, OutputSurface, PlaybackEvent, PlaybackSession,
    PlayerConfig,
};

#[derive(Default)]
struct Counters {
    fragments: AtomicU64,
    bytes: AtomicU64,
}

struct CountingSurface {
    counters: Arc<Counters>,
}

impl OutputSurface for CountingSurface {
    fn create_sink(
        &mut self,
        codecs: &Codecs,
        notifier: AppendNotifier,
    ) -> wsmp4f::Result<Box<dyn AppendSink>> {
        info!(mime = %codecs.mime_type(), generation = notifier.generation(), "Creating sink");
        Ok(Box::new(CountingSink { notifier, counters: Arc::clone(&self.counters) }))
    }
}

struct CountingSink {
    notifier: AppendNotifier,
    counters: Arc<Counters>,
}

impl AppendSink for CountingSink {
    fn append(&mut self, chunk: Bytes) -> wsmp4f::Result<()> {
        self.counters.fragments.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        self.notifier.complete();
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(capture) = args.next() else {
        bail!("usage: wsmp4f-replay <capture> [config.yaml]");
    };
    let config = match args.next() {
        Some(path) => PlayerConfig::load(&path).with_context(|| format!("loading config {path}"))?,
        None => PlayerConfig::default(),
    };

    let counters = Arc::new(Counters::default());
    let surface = CountingSurface { counters: Arc::clone(&counters) };
    let connector = ReplayConnector::new(&capture);

    let session = PlaybackSession::start(format!("file://{capture}"), connector, surface, config)
        .context("starting playback session")?;
    let mut events = session.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(PlaybackEvent::Metadata(metadata)) => {
                    info!(
                        id = %metadata.id,
                        name = %metadata.name,
                        observers = metadata.observer_total(),
                        "Metadata"
                    );
                }
                Ok(PlaybackEvent::Stopped) | Err(RecvError::Closed) => break,
                Ok(event) => info!(?event, "Session event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event listener lagged"),
            },
        }
    }

    session.shutdown().await.context("shutting down session")?;
    info!(
        fragments = counters.fragments.load(Ordering::Relaxed),
        bytes = counters.bytes.load(Ordering::Relaxed),
        "Replay finished"
    );
    Ok(())
}
