//! Append queue controller
//!
//! Serializes media chunks into a sink that accepts one append at a time.
//! The first chunk after an idle period goes straight to the sink; chunks that
//! arrive while an append is in flight wait in a FIFO and are issued one by one
//! as completions come back.
//!
//! The pending queue is unbounded. A sink that never completes grows it
//! without limit; there is no backpressure toward the transport.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::sink::{AppendOutcome, AppendSink};
use crate::types::{Codecs, QueueState};

/// Append queue bound to one sink generation
pub struct AppendQueue {
    /// Codec set the sink was created for
    codecs: Codecs,

    /// Generation stamped on the sink's notifier
    generation: u64,

    /// Exclusively owned sink; `None` once released
    sink: Option<Box<dyn AppendSink>>,

    /// Chunks waiting for the sink
    pending: VecDeque<Bytes>,

    state: QueueState,

    /// Chunks accepted by the sink
    issued: u64,

    /// Chunks the sink refused
    rejected: u64,
}

impl AppendQueue {
    /// Take ownership of a freshly created sink
    pub fn new(codecs: Codecs, generation: u64, sink: Box<dyn AppendSink>) -> Self {
        Self {
            codecs,
            generation,
            sink: Some(sink),
            pending: VecDeque::new(),
            state: QueueState::Idle,
            issued: 0,
            rejected: 0,
        }
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    /// Chunks waiting behind the in-flight append
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Chunks the sink accepted so far
    pub fn issued(&self) -> u64 {
        self.issued
    }

    /// Chunks the sink refused so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Hand a media chunk to the sink, or queue it behind the in-flight append
    pub fn enqueue(&mut self, chunk: Bytes) {
        match self.state {
            QueueState::Destroyed => {
                trace!(generation = self.generation, "enqueue after destroy ignored");
            }
            QueueState::Idle => self.issue(chunk),
            QueueState::Appending => {
                self.pending.push_back(chunk);
                trace!(generation = self.generation, pending = self.pending.len(), "chunk queued");
            }
        }
    }

    /// The sink finished its in-flight append
    ///
    /// A rejection is logged and otherwise handled like a completion, so one
    /// bad chunk can't stall the stream.
    pub fn on_append_complete(&mut self, outcome: AppendOutcome) {
        match self.state {
            QueueState::Destroyed => return,
            QueueState::Idle => {
                debug!(generation = self.generation, "completion with no append in flight ignored");
                return;
            }
            QueueState::Appending => {}
        }

        if let AppendOutcome::Rejected(reason) = outcome {
            self.rejected += 1;
            warn!(generation = self.generation, %reason, "sink rejected chunk, skipping");
        }

        match self.pending.pop_front() {
            Some(next) => self.issue(next),
            None => self.state = QueueState::Idle,
        }
    }

    /// Release the sink and drop every queued chunk. Idempotent.
    pub fn destroy(&mut self) {
        if self.state == QueueState::Destroyed {
            return;
        }

        let dropped = self.pending.len();
        self.pending.clear();
        self.state = QueueState::Destroyed;

        if let Some(mut sink) = self.sink.take() {
            sink.release();
        }

        debug!(
            generation = self.generation,
            codecs = %self.codecs,
            issued = self.issued,
            rejected = self.rejected,
            dropped,
            "append queue destroyed"
        );
    }

    /// Issue `chunk`; on synchronous refusal move on to the next queued chunk
    fn issue(&mut self, chunk: Bytes) {
        let mut next = Some(chunk);

        while let Some(chunk) = next.take() {
            let Some(sink) = self.sink.as_mut() else {
                return;
            };

            let len = chunk.len();
            match sink.append(chunk) {
                Ok(()) => {
                    self.issued += 1;
                    self.state = QueueState::Appending;
                    trace!(generation = self.generation, len, "append issued");
                    return;
                }
                Err(e) => {
                    self.rejected += 1;
                    warn!(generation = self.generation, error = %e, "sink refused chunk, skipping");
                    next = self.pending.pop_front();
                }
            }
        }

        self.state = QueueState::Idle;
    }
}

impl Drop for AppendQueue {
    fn drop(&mut self) {
        self.destroy();
    }
}
