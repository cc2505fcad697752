//! Test utilities: a recording output surface and helpers for driving sessions
//!
//! [`RecordingSurface`] stands in for a real media stack. Every sink it hands
//! out records appends and releases into a shared [`SurfaceProbe`], and never
//! completes an append on its own: tests decide when (and whether) each
//! append finishes, which makes ordering and single-flight behaviour
//! observable.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::Notify;

use crate::Result;
use crate::session::PlaybackSession;
use crate::sink::{AppendNotifier, AppendSink, OutputSurface};
use crate::types::{Codecs, SessionState};
use crate::PlayerError;

/// Something the surface or one of its sinks observed
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    SinkCreated { generation: u64, codecs: String },
    Appended { generation: u64, chunk: Bytes },
    Released { generation: u64 },
    Seek(f64),
}

#[derive(Default)]
struct ProbeState {
    events: Vec<SurfaceEvent>,
    notifiers: HashMap<u64, AppendNotifier>,
    in_flight: HashSet<u64>,
    overlaps: usize,
    unsupported: Vec<String>,
    refuse_appends: bool,
    hidden: bool,
    buffered_end: Option<f64>,
}

/// Shared view into a [`RecordingSurface`]
#[derive(Clone, Default)]
pub struct SurfaceProbe {
    state: Arc<Mutex<ProbeState>>,
    changed: Arc<Notify>,
}

impl SurfaceProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, event: SurfaceEvent) {
        self.lock().events.push(event);
        self.changed.notify_waiters();
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.lock().events.clone()
    }

    /// Chunks appended to the sink of `generation`, in issue order
    pub fn appended(&self, generation: u64) -> Vec<Bytes> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Appended { generation: g, chunk } if *g == generation => {
                    Some(chunk.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Chunks appended to any sink, in issue order
    pub fn all_appended(&self) -> Vec<Bytes> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Appended { chunk, .. } => Some(chunk.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(generation, codecs)` of every sink created
    pub fn sinks_created(&self) -> Vec<(u64, String)> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::SinkCreated { generation, codecs } => {
                    Some((*generation, codecs.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn released(&self) -> Vec<u64> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Released { generation } => Some(*generation),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                SurfaceEvent::Seek(position) => Some(*position),
                _ => None,
            })
            .collect()
    }

    /// Times a sink was handed a chunk while another append was in flight
    pub fn overlaps(&self) -> usize {
        self.lock().overlaps
    }

    pub fn in_flight(&self, generation: u64) -> bool {
        self.lock().in_flight.contains(&generation)
    }

    /// Finish the in-flight append of `generation`; `false` if none
    pub fn complete(&self, generation: u64) -> bool {
        self.finish(generation, None)
    }

    /// Fail the in-flight append of `generation`; `false` if none
    pub fn reject(&self, generation: u64, reason: &str) -> bool {
        self.finish(generation, Some(reason))
    }

    /// Signal a completion for `generation` whether or not anything is in flight
    pub fn complete_late(&self, generation: u64) {
        if let Some(notifier) = self.lock().notifiers.get(&generation) {
            notifier.complete();
        }
    }

    fn finish(&self, generation: u64, rejection: Option<&str>) -> bool {
        let mut state = self.lock();
        if !state.in_flight.remove(&generation) {
            return false;
        }
        if let Some(notifier) = state.notifiers.get(&generation) {
            match rejection {
                Some(reason) => notifier.reject(reason),
                None => notifier.complete(),
            }
        }
        true
    }

    /// Report codec lists containing `codec` as unsupported
    pub fn set_unsupported(&self, codec: &str) {
        self.lock().unsupported.push(codec.to_string());
    }

    /// Make every sink refuse appends synchronously
    pub fn set_refuse_appends(&self, refuse: bool) {
        self.lock().refuse_appends = refuse;
    }

    pub fn set_hidden(&self, hidden: bool, buffered_end: Option<f64>) {
        let mut state = self.lock();
        state.hidden = hidden;
        state.buffered_end = buffered_end;
    }

    /// Wait until `condition` holds
    pub async fn wait_until<F>(&self, condition: F)
    where
        F: Fn(&SurfaceProbe) -> bool,
    {
        loop {
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if condition(self) {
                return;
            }
            changed.await;
        }
    }
}

/// Output surface that records everything into a [`SurfaceProbe`]
pub struct RecordingSurface {
    probe: SurfaceProbe,
}

impl RecordingSurface {
    pub fn new() -> (Self, SurfaceProbe) {
        let probe = SurfaceProbe::default();
        (Self { probe: probe.clone() }, probe)
    }
}

impl OutputSurface for RecordingSurface {
    fn is_type_supported(&self, mime: &str) -> bool {
        !self.probe.lock().unsupported.iter().any(|codec| mime.contains(codec.as_str()))
    }

    fn create_sink(
        &mut self,
        codecs: &Codecs,
        notifier: AppendNotifier,
    ) -> Result<Box<dyn AppendSink>> {
        let generation = notifier.generation();
        self.probe.lock().notifiers.insert(generation, notifier);
        self.probe.record(SurfaceEvent::SinkCreated {
            generation,
            codecs: codecs.as_str().to_string(),
        });

        Ok(Box::new(RecordingSink { generation, probe: self.probe.clone() }))
    }

    fn is_hidden(&self) -> bool {
        self.probe.lock().hidden
    }

    fn buffered_end(&self) -> Option<f64> {
        self.probe.lock().buffered_end
    }

    fn seek(&mut self, position: f64) {
        self.probe.record(SurfaceEvent::Seek(position));
    }
}

struct RecordingSink {
    generation: u64,
    probe: SurfaceProbe,
}

impl AppendSink for RecordingSink {
    fn append(&mut self, chunk: Bytes) -> Result<()> {
        {
            let mut state = self.probe.lock();
            if state.refuse_appends {
                return Err(PlayerError::append_rejected("sink refusing appends"));
            }
            if !state.in_flight.insert(self.generation) {
                state.overlaps += 1;
            }
        }
        self.probe.record(SurfaceEvent::Appended { generation: self.generation, chunk });
        Ok(())
    }

    fn release(&mut self) {
        self.probe.lock().in_flight.remove(&self.generation);
        self.probe.record(SurfaceEvent::Released { generation: self.generation });
    }
}

/// Wait until `session` reports `target`
pub async fn wait_for_state(session: &PlaybackSession, target: SessionState) {
    let mut updates = Box::pin(session.state_updates());
    while let Some(state) = updates.next().await {
        if state == target {
            return;
        }
    }
}
