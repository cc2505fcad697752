//! Session supervisor
//!
//! One spawned task per playback session. It owns the transport, the output
//! surface and the current append queue, and serializes every event that can
//! touch them (inbound frames, append completions, the reconnect timer, stop)
//! through a single `select!` loop. Nothing inside a session needs a lock.
//!
//! Transport loss is never fatal: the queue is torn down (a new connection
//! always starts with a fresh codec announcement) and the reconnect timer is
//! armed. Only an explicit stop ends the loop.

use std::future;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::PlayerConfig;
use crate::demux::{self, DemuxEvent};
use crate::queue::AppendQueue;
use crate::session::PlaybackEvent;
use crate::sink::{AppendCompletion, AppendNotifier, OutputSurface};
use crate::timer::ReconnectTimer;
use crate::transport::{Connector, Transport};
use crate::types::{Codecs, SessionState, StreamMetadata};
use crate::PlayerError;

/// Handles returned to the session when the supervisor is spawned
pub(crate) struct SupervisorChannels {
    pub state: watch::Receiver<SessionState>,
    pub metadata: watch::Receiver<Option<Arc<StreamMetadata>>>,
    pub events: broadcast::Sender<PlaybackEvent>,
    pub cancel: CancellationToken,
    /// Resolves to the output surface once the supervisor has stopped
    pub task: JoinHandle<Box<dyn OutputSurface>>,
}

#[derive(Debug, Default)]
struct SupervisorStats {
    connects: u64,
    frames: u64,
    chunks: u64,
    dropped_chunks: u64,
    malformed_frames: u64,
}

enum Event {
    Stop,
    ReconnectDue,
    AppendDone(AppendCompletion),
    Frame(Bytes),
    Closed(Option<PlayerError>),
}

pub(crate) struct Supervisor {
    url: String,
    connector: Arc<dyn Connector>,
    surface: Box<dyn OutputSurface>,
    config: PlayerConfig,

    state: SessionState,
    transport: Option<Box<dyn Transport>>,
    queue: Option<AppendQueue>,
    /// Generation of the most recently created sink
    generation: u64,
    timer: ReconnectTimer,

    completions_tx: mpsc::UnboundedSender<AppendCompletion>,
    completions_rx: mpsc::UnboundedReceiver<AppendCompletion>,
    state_tx: watch::Sender<SessionState>,
    metadata_tx: watch::Sender<Option<Arc<StreamMetadata>>>,
    events: broadcast::Sender<PlaybackEvent>,
    cancel: CancellationToken,

    stats: SupervisorStats,
}

impl Supervisor {
    /// Spawn the supervisor task for `url`
    pub(crate) fn spawn(
        url: String,
        connector: Arc<dyn Connector>,
        surface: Box<dyn OutputSurface>,
        config: PlayerConfig,
    ) -> SupervisorChannels {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (metadata_tx, metadata_rx) = watch::channel(None);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let supervisor = Supervisor {
            url,
            connector,
            surface,
            timer: ReconnectTimer::new(config.reconnect_delay()),
            config,
            state: SessionState::Disconnected,
            transport: None,
            queue: None,
            generation: 0,
            completions_tx,
            completions_rx,
            state_tx,
            metadata_tx,
            events: events.clone(),
            cancel: cancel.clone(),
            stats: SupervisorStats::default(),
        };

        let task = tokio::spawn(supervisor.run());

        SupervisorChannels { state: state_rx, metadata: metadata_rx, events, cancel, task }
    }

    async fn run(mut self) -> Box<dyn OutputSurface> {
        info!(url = %self.url, "Session supervisor started");

        self.connect().await;

        while !self.state.is_terminal() {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Event::Stop,
                _ = self.timer.fired() => Event::ReconnectDue,
                Some(done) = self.completions_rx.recv() => Event::AppendDone(done),
                event = next_transport_event(&mut self.transport) => event,
            };

            match event {
                Event::Stop => self.teardown().await,
                Event::ReconnectDue => {
                    if !self.halted() {
                        info!(url = %self.url, "Reconnecting");
                        self.connect().await;
                    }
                }
                Event::AppendDone(done) => self.on_append_done(done),
                Event::Frame(frame) => self.on_frame(frame),
                Event::Closed(error) => self.on_transport_closed(error),
            }
        }

        info!(
            url = %self.url,
            connects = self.stats.connects,
            frames = self.stats.frames,
            chunks = self.stats.chunks,
            dropped_chunks = self.stats.dropped_chunks,
            malformed_frames = self.stats.malformed_frames,
            "Session supervisor ended"
        );

        self.surface
    }

    /// Stop requested or already torn down; late events must not touch state
    fn halted(&self) -> bool {
        self.cancel.is_cancelled() || self.state.is_terminal()
    }

    async fn connect(&mut self) {
        if self.halted() {
            self.teardown().await;
            return;
        }

        self.set_state(SessionState::Connecting);
        self.stats.connects += 1;
        debug!(url = %self.url, attempt = self.stats.connects, "Opening transport");

        let attempt = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.connector.connect(&self.url) => Some(result),
        };

        match attempt {
            None => self.teardown().await,
            Some(Ok(transport)) => {
                self.transport = Some(transport);
                self.set_state(SessionState::Open);
                info!(url = %self.url, "Transport open");
                self.emit(PlaybackEvent::Connected { url: self.url.clone() });
            }
            Some(Err(e)) => self.on_transport_closed(Some(e)),
        }
    }

    fn on_frame(&mut self, frame: Bytes) {
        if self.halted() {
            return;
        }
        self.stats.frames += 1;

        match demux::classify(frame) {
            Ok(DemuxEvent::CodecAnnounced(codecs)) => self.install_sink(codecs),
            Ok(DemuxEvent::MetadataReceived(metadata)) => self.publish_metadata(metadata),
            Ok(DemuxEvent::MediaChunk(chunk)) => match self.queue.as_mut() {
                Some(queue) => {
                    self.stats.chunks += 1;
                    queue.enqueue(chunk);
                }
                None => {
                    self.stats.dropped_chunks += 1;
                    debug!(len = chunk.len(), "No sink for media chunk, dropping");
                }
            },
            Err(e) => {
                self.stats.malformed_frames += 1;
                warn!(error = %e, "Dropping malformed frame");
            }
        }

        self.catch_up_live_edge();
    }

    fn on_append_done(&mut self, done: AppendCompletion) {
        if self.halted() {
            return;
        }

        match self.queue.as_mut() {
            Some(queue) if queue.generation() == done.generation => {
                queue.on_append_complete(done.outcome);
            }
            _ => trace!(generation = done.generation, "Ignoring completion from stale sink"),
        }
    }

    /// Replace the current sink with one for `codecs`
    fn install_sink(&mut self, codecs: Codecs) {
        self.destroy_queue();

        self.generation += 1;
        let generation = self.generation;
        let mime = codecs.mime_type();

        if !self.surface.is_type_supported(&mime) {
            let error = PlayerError::unsupported_codec(codecs.as_str(), format!("{mime} unsupported"));
            self.report_unsupported(codecs, error);
            return;
        }

        let notifier = AppendNotifier::new(generation, self.completions_tx.clone());
        match self.surface.create_sink(&codecs, notifier) {
            Ok(sink) => {
                info!(generation, codecs = %codecs, "Sink created");
                self.queue = Some(AppendQueue::new(codecs.clone(), generation, sink));
                self.emit(PlaybackEvent::CodecChanged(codecs));
            }
            Err(e) => self.report_unsupported(codecs, e),
        }
    }

    fn report_unsupported(&mut self, codecs: Codecs, error: PlayerError) {
        error!(codecs = %codecs, error = %error, "Cannot play announced codecs");
        self.emit(PlaybackEvent::CodecUnsupported { codecs, reason: error.to_string() });
    }

    fn publish_metadata(&mut self, metadata: StreamMetadata) {
        let metadata = Arc::new(metadata);
        trace!(at = ?metadata.at, observers = metadata.observer_total(), "Metadata");
        self.metadata_tx.send_replace(Some(Arc::clone(&metadata)));
        self.emit(PlaybackEvent::Metadata(metadata));
    }

    /// Keep a hidden surface at the live edge instead of drifting behind
    fn catch_up_live_edge(&mut self) {
        if !self.config.catch_up_live_edge || !self.surface.is_hidden() {
            return;
        }
        if let Some(end) = self.surface.buffered_end() {
            let target = (end - self.config.live_edge_offset().as_secs_f64()).max(0.0);
            trace!(buffered_end = end, target, "Seeking hidden surface to live edge");
            self.surface.seek(target);
        }
    }

    fn on_transport_closed(&mut self, error: Option<PlayerError>) {
        self.transport = None;

        match &error {
            Some(e) => warn!(url = %self.url, error = %e, "Transport lost"),
            None => info!(url = %self.url, "Transport closed"),
        }

        self.destroy_queue();
        self.emit(PlaybackEvent::Disconnected { reason: error.map(|e| e.to_string()) });

        if self.halted() {
            self.finish();
            return;
        }

        self.timer.arm();
        self.set_state(SessionState::ReconnectPending);
        info!(
            url = %self.url,
            delay_ms = self.timer.delay().as_millis() as u64,
            "Reconnect scheduled"
        );
        self.emit(PlaybackEvent::Reconnecting { delay: self.timer.delay() });
    }

    /// Explicit stop: release everything, close the transport, go terminal
    async fn teardown(&mut self) {
        self.timer.cancel();
        self.destroy_queue();

        if let Some(mut transport) = self.transport.take() {
            let timeout = self.config.close_timeout();
            match tokio::time::timeout(timeout, transport.close()).await {
                Ok(Ok(())) => debug!(url = %self.url, "Transport closed on stop"),
                Ok(Err(e)) => debug!(url = %self.url, error = %e, "Transport close failed"),
                Err(_) => {
                    let error = PlayerError::Timeout { duration: timeout };
                    warn!(url = %self.url, error = %error, "Abandoning transport close");
                }
            }
        }

        self.finish();
    }

    fn finish(&mut self) {
        self.timer.cancel();
        self.destroy_queue();

        if !self.state.is_terminal() {
            self.set_state(SessionState::Destroyed);
            info!(url = %self.url, "Playback stopped");
            self.emit(PlaybackEvent::Stopped);
        }
    }

    fn destroy_queue(&mut self) {
        if let Some(mut queue) = self.queue.take() {
            queue.destroy();
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(url = %self.url, from = ?self.state, to = ?state, "Session state");
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }
}

/// Next event from the live transport; never resolves while disconnected
async fn next_transport_event(transport: &mut Option<Box<dyn Transport>>) -> Event {
    let Some(transport) = transport.as_mut() else {
        return future::pending().await;
    };

    match transport.next_frame().await {
        Ok(Some(frame)) => Event::Frame(frame),
        Ok(None) => Event::Closed(None),
        Err(e) => Event::Closed(Some(e)),
    }
}
