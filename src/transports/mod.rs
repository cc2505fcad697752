//! Transport implementations
//!
//! - [`channel`]: in-process duplex channel fed by the host application
//! - [`replay`]: length-prefixed capture file played back as a live stream

pub mod channel;
pub mod replay;

pub use channel::{Accepted, ChannelConnector, FrameFeed, Incoming};
pub use replay::{ReplayConnector, append_record};
