//! Codec descriptor announced by the stream

use std::fmt;
use std::str::FromStr;

use crate::{PlayerError, Result};

/// Comma-separated codec descriptor string (RFC 6381 style)
///
/// The announced text is kept verbatim so the MIME type handed to the output
/// surface matches what the server sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Codecs(String);

impl Codecs {
    /// Parse a codec list; blank input is rejected
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(PlayerError::decode("codec frame", "empty codec list"));
        }
        Ok(Self(text.to_string()))
    }

    /// Raw descriptor text as announced
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Individual codec identifiers, trimmed
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.split(',').map(str::trim).filter(|codec| !codec.is_empty())
    }

    /// MIME type used for support checks and sink creation
    pub fn mime_type(&self) -> String {
        format!("video/mp4; codecs=\"{}\"", self.0)
    }
}

impl FromStr for Codecs {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Codecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_codec_list() {
        let codecs = Codecs::parse("avc1.64001f, mp4a.40.2").unwrap();
        assert_eq!(codecs.iter().collect::<Vec<_>>(), vec!["avc1.64001f", "mp4a.40.2"]);
        assert_eq!(codecs.as_str(), "avc1.64001f, mp4a.40.2");
    }

    #[test]
    fn blank_list_is_a_decode_error() {
        assert!(matches!(Codecs::parse("  "), Err(PlayerError::Decode { .. })));
    }

    #[test]
    fn mime_type_wraps_raw_text() {
        let codecs: Codecs = "avc1.4d401f".parse().unwrap();
        assert_eq!(codecs.mime_type(), "video/mp4; codecs=\"avc1.4d401f\"");
    }
}
