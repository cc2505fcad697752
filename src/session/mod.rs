//! Playback session handle
//!
//! [`PlaybackSession`] is the playback-control surface the rest of an
//! application talks to: start and stop a stream, read the latest metadata,
//! and listen for [`PlaybackEvent`] notifications. The work happens on the
//! supervisor task; this handle only holds channels to it.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PlayerConfig;
use crate::sink::OutputSurface;
use crate::stream::LatestExt;
use crate::supervisor::Supervisor;
use crate::transport::Connector;
use crate::types::{Codecs, SessionState, StreamMetadata, UpdateRate};
use crate::{PlayerError, Result};


/// Notification broadcast to interested listeners
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Transport opened
    Connected { url: String },

    /// A sink was created for a newly announced codec set
    CodecChanged(Codecs),

    /// The surface can't play the announced codecs; media is dropped until
    /// the next announcement
    CodecUnsupported { codecs: Codecs, reason: String },

    /// Metadata frame received
    Metadata(Arc<StreamMetadata>),

    /// Transport closed or failed
    Disconnected { reason: Option<String> },

    /// Reconnect timer armed
    Reconnecting { delay: Duration },

    /// Session stopped by the caller (terminal)
    Stopped,
}

/// A running "play this URL" session, spanning any number of reconnects
pub struct PlaybackSession {
    url: String,

    /// Supervisor state
    state: watch::Receiver<SessionState>,

    /// Last metadata received
    metadata: watch::Receiver<Option<Arc<StreamMetadata>>>,

    /// Event fan-out, kept to hand out receivers
    events: broadcast::Sender<PlaybackEvent>,

    /// Stop signal observed by every suspension point of the supervisor
    cancel: CancellationToken,

    /// Supervisor task; yields the surface back when it ends
    task: Option<JoinHandle<Box<dyn OutputSurface>>>,
}

impl PlaybackSession {
    /// Start playing `url`, rendering into `surface`.
    ///
    /// Must be called from within a Tokio runtime. Returns as soon as the
    /// supervisor is spawned; connection progress shows up in
    /// [`PlaybackSession::state`] and [`PlaybackSession::subscribe`].
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Config`] if `config` fails validation.
    pub fn start<C, S>(
        url: impl Into<String>,
        connector: C,
        surface: S,
        config: PlayerConfig,
    ) -> Result<Self>
    where
        C: Connector,
        S: OutputSurface,
    {
        Self::start_shared(url, Arc::new(connector), Box::new(surface), config)
    }

    /// Like [`PlaybackSession::start`] with an already shared connector and boxed surface
    pub fn start_shared(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        surface: Box<dyn OutputSurface>,
        config: PlayerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::spawn(url.into(), connector, surface, config))
    }

    pub(crate) fn spawn(
        url: String,
        connector: Arc<dyn Connector>,
        surface: Box<dyn OutputSurface>,
        config: PlayerConfig,
    ) -> Self {
        info!(url = %url, "Starting playback session");

        let channels = Supervisor::spawn(url.clone(), connector, surface, config);

        Self {
            url,
            state: channels.state,
            metadata: channels.metadata,
            events: channels.events,
            cancel: channels.cancel,
            task: Some(channels.task),
        }
    }

    /// URL this session plays
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request a stop. Idempotent and non-blocking.
    ///
    /// Any armed reconnect is cancelled, the transport is closed and the sink
    /// released. Use [`PlaybackSession::shutdown`] to wait for that to finish.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!(url = %self.url, "Stopping playback session");
            self.cancel.cancel();
        }
    }

    /// Whether a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the supervisor to finish, reclaiming the surface.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SurfaceUnavailable`] if the supervisor task
    /// panicked and took the surface with it.
    pub async fn shutdown(mut self) -> Result<Box<dyn OutputSurface>> {
        self.stop();

        let task = self
            .task
            .take()
            .ok_or_else(|| PlayerError::surface_unavailable("session already shut down"))?;

        let surface = task.await.map_err(|e| {
            PlayerError::surface_unavailable(format!("supervisor task failed: {e}"))
        })?;

        debug!(url = %self.url, "Playback session shut down");
        Ok(surface)
    }

    /// Current supervisor state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Supervisor state, starting with the current one
    ///
    /// Backed by a watch channel: a slow reader sees the latest state and may
    /// skip intermediate ones.
    pub fn state_updates(&self) -> impl Stream<Item = SessionState> + Send + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Last metadata received, if any
    pub fn current_metadata(&self) -> Option<Arc<StreamMetadata>> {
        self.metadata.borrow().clone()
    }

    /// Metadata as it arrives, starting with the current value
    ///
    /// With [`UpdateRate::Max`] updates are spaced at least one interval apart
    /// and only the latest metadata of each interval is emitted.
    pub fn metadata_updates(
        &self,
        rate: UpdateRate,
    ) -> impl Stream<Item = Arc<StreamMetadata>> + Send + 'static {
        let updates = WatchStream::new(self.metadata.clone()).filter_map(|opt| async move { opt });

        match rate.interval() {
            None => updates.boxed(),
            Some(period) => updates.latest_every(period).boxed(),
        }
    }

    /// Subscribe to playback notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        if self.task.is_some() {
            debug!(url = %self.url, "Dropping playback session");
        }
        // Stop the supervisor so an abandoned handle never keeps reconnecting.
        self.cancel.cancel();
    }
}
