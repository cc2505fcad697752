//! Source switching over a single output surface

use std::sync::Arc;

use tracing::info;

use crate::config::PlayerConfig;
use crate::session::PlaybackSession;
use crate::sink::OutputSurface;
use crate::transport::Connector;
use crate::{PlayerError, Result};

/// Entry point for playing live streams into one output surface.
///
/// Owns the surface between sessions. Loading a new URL shuts the current
/// session down (releasing its sink) before the next one starts, so the
/// surface never has two sessions writing to it.
///
/// # Example
///
/// ```rust,no_run
/// use bytes::Bytes;
/// use wsmp4f::transports::ChannelConnector;
/// use wsmp4f::{AppendNotifier, AppendSink, Codecs, LivePlayer, OutputSurface, PlayerConfig};
///
/// struct Discard(AppendNotifier);
///
/// impl AppendSink for Discard {
///     fn append(&mut self, _chunk: Bytes) -> wsmp4f::Result<()> {
///         self.0.complete();
///         Ok(())
///     }
/// }
///
/// struct Headless;
///
/// impl OutputSurface for Headless {
///     fn create_sink(
///         &mut self,
///         _codecs: &Codecs,
///         notifier: AppendNotifier,
///     ) -> wsmp4f::Result<Box<dyn AppendSink>> {
///         Ok(Box::new(Discard(notifier)))
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> wsmp4f::Result<()> {
/// let (connector, _incoming) = ChannelConnector::new();
/// let mut player = LivePlayer::new(connector, Headless, PlayerConfig::default())?;
///
/// player.load("ws://nvr.local/livestreams/cam-1/wsmp4f").await?;
/// player.load("ws://nvr.local/livestreams/cam-2/wsmp4f").await?;
/// player.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct LivePlayer {
    connector: Arc<dyn Connector>,

    /// Surface while no session holds it
    surface: Option<Box<dyn OutputSurface>>,

    session: Option<PlaybackSession>,
    config: PlayerConfig,
}

impl LivePlayer {
    /// Create a player bound to `surface`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Config`] if `config` fails validation.
    pub fn new<C, S>(connector: C, surface: S, config: PlayerConfig) -> Result<Self>
    where
        C: Connector,
        S: OutputSurface,
    {
        config.validate()?;
        Ok(Self {
            connector: Arc::new(connector),
            surface: Some(Box::new(surface)),
            session: None,
            config,
        })
    }

    /// Play `url`, stopping whatever was playing first.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::SurfaceUnavailable`] if the previous session
    /// could not hand the surface back.
    pub async fn load(&mut self, url: impl Into<String>) -> Result<&PlaybackSession> {
        self.stop().await?;

        let surface = self.surface.take().ok_or_else(|| {
            PlayerError::surface_unavailable("surface was lost by a previous session")
        })?;

        let url = url.into();
        info!(url = %url, "Loading stream");
        let session =
            PlaybackSession::spawn(url, Arc::clone(&self.connector), surface, self.config.clone());

        Ok(self.session.insert(session))
    }

    /// Stop the current session, if any, and take the surface back
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            let surface = session.shutdown().await?;
            self.surface = Some(surface);
        }
        Ok(())
    }

    /// Session currently playing
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// URL currently playing
    pub fn url(&self) -> Option<&str> {
        self.session.as_ref().map(PlaybackSession::url)
    }
}
