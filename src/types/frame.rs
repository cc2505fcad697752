//! Frame tag byte

use bytes::{BufMut, Bytes, BytesMut};

/// Interpretation selected by the first byte of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTag {
    /// Opaque media chunk; the tag byte stays part of the chunk
    Media,

    /// UTF-8 JSON metadata object follows the tag
    Metadata,

    /// UTF-8 codec list follows the tag
    Codec,
}

impl FrameTag {
    /// Tag byte for metadata frames
    pub const METADATA_BYTE: u8 = 0x08;

    /// Tag byte for codec announcements
    pub const CODEC_BYTE: u8 = 0x09;

    /// Tag byte the stream server writes in front of media chunks
    pub const MEDIA_BYTE: u8 = 0x00;

    /// Classify a tag byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            Self::METADATA_BYTE => FrameTag::Metadata,
            Self::CODEC_BYTE => FrameTag::Codec,
            _ => FrameTag::Media,
        }
    }

    /// Tag of a frame, or `None` for an empty frame
    pub fn of(frame: &[u8]) -> Option<Self> {
        frame.first().copied().map(Self::from_byte)
    }

    /// Byte written for this tag by [`FrameTag::build`]
    pub fn byte(self) -> u8 {
        match self {
            FrameTag::Media => Self::MEDIA_BYTE,
            FrameTag::Metadata => Self::METADATA_BYTE,
            FrameTag::Codec => Self::CODEC_BYTE,
        }
    }

    /// Prefix `payload` with this tag, producing a wire frame
    pub fn build(self, payload: &[u8]) -> Bytes {
        let mut frame = BytesMut::with_capacity(payload.len() + 1);
        frame.put_u8(self.byte());
        frame.put_slice(payload);
        frame.freeze()
    }
}
