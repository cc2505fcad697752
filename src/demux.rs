//! Frame demultiplexer
//!
//! Classifies each inbound frame by its tag byte. Stateless: every frame is
//! read on its own, and nothing is buffered between calls.

use bytes::Bytes;

use crate::types::{Codecs, FrameTag, StreamMetadata};
use crate::{PlayerError, Result};

/// What a single frame means to the playback engine
#[derive(Debug, Clone, PartialEq)]
pub enum DemuxEvent {
    /// A new codec set; the current sink must be replaced
    CodecAnnounced(Codecs),

    /// Status for the UI; never touches the append queue
    MetadataReceived(StreamMetadata),

    /// The whole frame, tag byte included, for the current sink
    MediaChunk(Bytes),
}

/// Classify one frame.
///
/// Media chunks share the frame's buffer, so no bytes are copied. Codec and
/// metadata frames that can't be decoded return [`PlayerError::Decode`]; the
/// caller drops the frame and keeps the session alive.
pub fn classify(frame: Bytes) -> Result<DemuxEvent> {
    let Some(tag) = FrameTag::of(&frame) else {
        return Err(PlayerError::decode("frame", "empty frame has no tag byte"));
    };

    match tag {
        FrameTag::Codec => {
            let text = std::str::from_utf8(&frame[1..])
                .map_err(|e| PlayerError::decode("codec frame", e.to_string()))?;
            Ok(DemuxEvent::CodecAnnounced(Codecs::parse(text)?))
        }
        FrameTag::Metadata => {
            let metadata = StreamMetadata::from_json_slice(&frame[1..])?;
            Ok(DemuxEvent::MetadataReceived(metadata))
        }
        FrameTag::Media => Ok(DemuxEvent::MediaChunk(frame)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn codec_frame_announces_codecs() {
        let frame = FrameTag::Codec.build("avc1.4d401f".as_bytes());
        let event = classify(frame).unwrap();
        assert_eq!(event, DemuxEvent::CodecAnnounced(Codecs::parse("avc1.4d401f").unwrap()));
    }

    #[test]
    fn metadata_frame_is_decoded() {
        let frame = FrameTag::Metadata.build(br#"{"at":"2024-01-01T00:00:00Z"}"#);
        match classify(frame).unwrap() {
            DemuxEvent::MetadataReceived(metadata) => {
                assert_eq!(metadata.at.as_deref(), Some("2024-01-01T00:00:00Z"));
            }
            other => panic!("expected metadata, got {other:?}"),
        }
    }

    #[test]
    fn metadata_with_unexpected_field_types_is_still_delivered() {
        for payload in [
            &br#"{"at":"2024-01-01T00:00:00Z","observers":null}"#[..],
            br#"{"at":1704067200}"#,
            br#"{"id":7,"observers":{"live":1}}"#,
        ] {
            let event = classify(FrameTag::Metadata.build(payload)).unwrap();
            assert!(matches!(event, DemuxEvent::MetadataReceived(_)), "{event:?}");
        }
    }

    #[test]
    fn media_chunk_keeps_tag_byte() {
        let frame = Bytes::from_static(&[0x07, 0xAA, 0xBB]);
        assert_eq!(
            classify(frame).unwrap(),
            DemuxEvent::MediaChunk(Bytes::from_static(&[0x07, 0xAA, 0xBB]))
        );
    }

    #[test]
    fn malformed_payloads_are_decode_errors() {
        let bad_utf8 = Bytes::from_static(&[0x09, 0xFF, 0xFE]);
        assert!(matches!(classify(bad_utf8), Err(PlayerError::Decode { .. })));

        let bad_json = FrameTag::Metadata.build(b"{\"observers\":");
        assert!(matches!(classify(bad_json), Err(PlayerError::Decode { .. })));

        let empty_codecs = FrameTag::Codec.build(b"");
        assert!(matches!(classify(empty_codecs), Err(PlayerError::Decode { .. })));

        assert!(matches!(classify(Bytes::new()), Err(PlayerError::Decode { .. })));
    }

    proptest! {
        #[test]
        fn media_frames_pass_through_untouched(
            tag in any::<u8>().prop_filter("control tag", |b| *b != 0x08 && *b != 0x09),
            body in prop::collection::vec(any::<u8>(), 0..256)
        ) {
            let mut raw = vec![tag];
            raw.extend_from_slice(&body);
            let event = classify(Bytes::from(raw.clone())).unwrap();
            prop_assert_eq!(event, DemuxEvent::MediaChunk(Bytes::from(raw)));
        }

        #[test]
        fn codec_text_survives_framing(text in "[a-z0-9]{1,8}(\\.[0-9a-f]{1,6})?(, ?[a-z0-9]{1,8}(\\.[0-9]{1,2}){0,2}){0,2}") {
            let event = classify(FrameTag::Codec.build(text.as_bytes())).unwrap();
            prop_assert_eq!(event, DemuxEvent::CodecAnnounced(Codecs::parse(&text).unwrap()));
        }
    }
}
