//! Lifecycle states of the session supervisor and append queue

use serde::{Deserialize, Serialize};

/// Session supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Not yet started
    Disconnected,

    /// Transport connection attempt in progress
    Connecting,

    /// Transport open, frames flowing
    Open,

    /// Transport lost; reconnect timer armed
    ReconnectPending,

    /// Stopped by the caller (terminal)
    Destroyed,
}

impl SessionState {
    /// Whether no further transitions can happen
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Destroyed)
    }
}

/// Append queue controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    /// No append in flight
    Idle,

    /// One append in flight; later chunks wait in the pending queue
    Appending,

    /// Sink released; every call is a no-op
    Destroyed,
}
