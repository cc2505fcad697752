//! Core types for the tagged frame protocol and playback state.
//!
//! ## Wire format
//!
//! Every message the transport delivers is one frame. The first byte selects
//! how the rest is read:
//!
//! - [`FrameTag::Codec`] (`0x09`): UTF-8 codec list, e.g. `avc1.64001f, mp4a.40.2`
//! - [`FrameTag::Metadata`] (`0x08`): UTF-8 JSON [`StreamMetadata`] object
//! - anything else: the whole frame, tag byte included, is an fMP4 media chunk
//!
//! ## Usage Example
//!
//! ```rust
//! use wsmp4f::types::{Codecs, FrameTag};
//!
//! let frame = FrameTag::Codec.build(b"avc1.4d401f");
//! assert_eq!(frame[0], 0x09);
//! assert_eq!(FrameTag::of(&frame), Some(FrameTag::Codec));
//!
//! let codecs: Codecs = "avc1.64001f, mp4a.40.2".parse().unwrap();
//! assert_eq!(codecs.mime_type(), "video/mp4; codecs=\"avc1.64001f, mp4a.40.2\"");
//! ```

mod codecs;
mod frame;
mod metadata;
mod state;
mod update_rate;

pub use codecs::Codecs;
pub use frame::FrameTag;
pub use metadata::StreamMetadata;
pub use state::{QueueState, SessionState};
pub use update_rate::UpdateRate;
