//! Output surface and append sink capabilities
//!
//! The host application supplies an [`OutputSurface`] (a video element's
//! media source, a file muxer, a test probe). For each codec announcement the
//! supervisor asks it for an [`AppendSink`] bound to that codec set. A sink
//! accepts one chunk at a time and reports completion through the
//! [`AppendNotifier`] it was created with.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::Result;
use crate::types::Codecs;

/// Result of one append as reported by the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The chunk was consumed
    Completed,

    /// The sink gave up on the chunk
    Rejected(String),
}

/// Completion message routed back to the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendCompletion {
    /// Generation of the sink that finished
    pub generation: u64,

    /// How the append ended
    pub outcome: AppendOutcome,
}

/// Handle a sink uses to signal that its in-flight append finished
///
/// Each sink gets a notifier stamped with its generation. Completions from a
/// sink that has since been replaced or released are ignored by the
/// supervisor, so a sink may fire late without harm.
#[derive(Debug, Clone)]
pub struct AppendNotifier {
    generation: u64,
    tx: mpsc::UnboundedSender<AppendCompletion>,
}

impl AppendNotifier {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<AppendCompletion>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the sink this notifier belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The in-flight append finished
    pub fn complete(&self) {
        self.send(AppendOutcome::Completed);
    }

    /// The in-flight append failed
    pub fn reject(&self, reason: impl Into<String>) {
        self.send(AppendOutcome::Rejected(reason.into()));
    }

    fn send(&self, outcome: AppendOutcome) {
        // Supervisor gone means the session is over; nothing to notify.
        let _ = self.tx.send(AppendCompletion { generation: self.generation, outcome });
    }
}

/// Codec-specific destination for media chunks
pub trait AppendSink: Send + 'static {
    /// Issue one chunk
    ///
    /// `Ok(())` means the append is now pending and the sink will call its
    /// notifier when done. `Err` means the chunk was refused outright; no
    /// notification follows.
    fn append(&mut self, chunk: Bytes) -> Result<()>;

    /// Release the sink; called exactly once when its queue is destroyed
    fn release(&mut self) {}
}

/// Caller-supplied mount target for playback
pub trait OutputSurface: Send + 'static {
    /// Whether the surface can play `mime` (e.g. `video/mp4; codecs="avc1.64001f"`)
    fn is_type_supported(&self, _mime: &str) -> bool {
        true
    }

    /// Create a sink for `codecs`
    fn create_sink(
        &mut self,
        codecs: &Codecs,
        notifier: AppendNotifier,
    ) -> Result<Box<dyn AppendSink>>;

    /// Whether the surface is currently not visible to the user
    fn is_hidden(&self) -> bool {
        false
    }

    /// End of the buffered range in seconds, if anything is buffered
    fn buffered_end(&self) -> Option<f64> {
        None
    }

    /// Move the playhead to `position` seconds
    fn seek(&mut self, _position: f64) {}
}
