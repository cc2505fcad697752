//! Capture file replay transport
//!
//! A capture is a sequence of frames, each written as a big-endian `u32`
//! length followed by the frame bytes. Replaying one exercises the full
//! playback path without a stream server. Reaching the end of the file is a
//! clean close, so a supervised session reconnects and the capture loops.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::transport::{Connector, Transport};
use crate::{PlayerError, Result};

/// Largest record accepted from a capture (64 MiB)
const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// Append one frame to a capture buffer
///
/// # Errors
///
/// Returns [`PlayerError::Decode`] for frames longer than a replay accepts;
/// `capture` is left untouched.
pub fn append_record(capture: &mut Vec<u8>, frame: &[u8]) -> Result<()> {
    capture.put_u32(record_len(frame.len())?);
    capture.put_slice(frame);
    Ok(())
}

/// Length prefix for a frame of `len` bytes
fn record_len(len: usize) -> Result<u32> {
    u32::try_from(len).ok().filter(|len| *len <= MAX_RECORD_LEN).ok_or_else(|| {
        PlayerError::decode("capture record", format!("frame of {len} bytes exceeds {MAX_RECORD_LEN}"))
    })
}

/// Connector that replays a capture file on every connect
#[derive(Debug, Clone)]
pub struct ReplayConnector {
    path: PathBuf,

    /// Spacing between frames; `None` replays as fast as the player reads
    pacing: Option<Duration>,
}

impl ReplayConnector {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), pacing: None }
    }

    /// Deliver at most one frame per `pacing`
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = Some(pacing);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl Connector for ReplayConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| {
                PlayerError::transport_failed_with_source(
                    format!("cannot open capture for {url}"),
                    Box::new(PlayerError::file_error(self.path.clone(), e)),
                )
            })?;

        info!(url, path = %self.path.display(), "Replaying capture");

        let pacing = self.pacing.map(|period| {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        Ok(Box::new(ReplayTransport {
            reader: Some(BufReader::new(file)),
            path: self.path.clone(),
            pacing,
            paced: false,
            buf: BytesMut::new(),
            frames: 0,
        }))
    }
}

struct ReplayTransport {
    /// `None` once closed
    reader: Option<BufReader<File>>,
    path: PathBuf,
    pacing: Option<Interval>,

    /// A pacing slot was already spent on the frame being read
    paced: bool,

    /// Bytes read from the capture but not yet returned
    buf: BytesMut,

    frames: u64,
}

impl ReplayTransport {
    /// Split the next whole record off `buf`, if one is buffered.
    ///
    /// Returns the total record size still needed otherwise.
    fn take_record(&mut self) -> Result<std::result::Result<Bytes, usize>> {
        let mut prefix = &self.buf[..];
        if prefix.len() < 4 {
            return Ok(Err(4));
        }

        let len = prefix.get_u32();
        if len > MAX_RECORD_LEN {
            return Err(PlayerError::decode(
                "capture record",
                format!("record length {len} exceeds {MAX_RECORD_LEN}"),
            ));
        }

        let needed = 4 + len as usize;
        if self.buf.len() < needed {
            return Ok(Err(needed));
        }

        self.buf.advance(4);
        Ok(Ok(self.buf.split_to(len as usize).freeze()))
    }
}

#[async_trait::async_trait]
impl Transport for ReplayTransport {
    async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.reader.is_none() {
            return Ok(None);
        }

        if !self.paced {
            if let Some(pacing) = self.pacing.as_mut() {
                pacing.tick().await;
            }
            self.paced = true;
        }

        loop {
            let needed = match self.take_record()? {
                Ok(frame) => {
                    self.paced = false;
                    self.frames += 1;
                    trace!(frame = self.frames, len = frame.len(), "Replayed frame");
                    return Ok(Some(frame));
                }
                Err(needed) => needed,
            };

            let Some(reader) = self.reader.as_mut() else {
                return Ok(None);
            };

            // read_buf only fills `buf` once it completes, so dropping this
            // future mid-read leaves every record intact
            self.buf.reserve(needed - self.buf.len());
            let read = reader.read_buf(&mut self.buf).await.map_err(|e| {
                PlayerError::transport_failed_with_source(
                    "capture read failed",
                    Box::new(PlayerError::file_error(self.path.clone(), e)),
                )
            })?;

            if read == 0 {
                if self.buf.is_empty() {
                    debug!(frames = self.frames, "Reached end of capture");
                    return Ok(None);
                }
                return Err(PlayerError::decode(
                    "capture record",
                    format!("truncated record: {} trailing bytes", self.buf.len()),
                ));
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.reader = None;
        self.buf.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameTag;
    use std::io::Write;

    fn capture(frames: &[Bytes]) -> tempfile::NamedTempFile {
        let mut buf = Vec::new();
        for frame in frames {
            append_record(&mut buf, frame).unwrap();
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buf).unwrap();
        file
    }

    #[tokio::test]
    async fn replays_records_then_closes() {
        let frames = vec![
            FrameTag::Codec.build(b"avc1.64001f"),
            FrameTag::Media.build(&[1, 2, 3]),
            FrameTag::Metadata.build(b"{}"),
        ];
        let file = capture(&frames);

        let connector = ReplayConnector::new(file.path());
        let mut transport = connector.connect("replay://test").await.unwrap();

        for expected in &frames {
            assert_eq!(transport.next_frame().await.unwrap().as_ref(), Some(expected));
        }
        assert_eq!(transport.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn truncated_record_is_an_error_close() {
        let file = capture(&[FrameTag::Media.build(&[9; 16])]);
        let full = std::fs::read(file.path()).unwrap();
        std::fs::write(file.path(), &full[..full.len() - 4]).unwrap();

        let mut transport = ReplayConnector::new(file.path()).connect("replay://t").await.unwrap();
        assert!(matches!(transport.next_frame().await, Err(PlayerError::Decode { .. })));
    }

    #[tokio::test]
    async fn closed_transport_yields_nothing() {
        let file = capture(&[FrameTag::Media.build(&[1])]);
        let mut transport = ReplayConnector::new(file.path()).connect("replay://t").await.unwrap();

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert_eq!(transport.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_capture_fails_connect() {
        let connector = ReplayConnector::new("/nonexistent/capture.bin");
        let error = match connector.connect("replay://t").await {
            Err(error) => error,
            Ok(_) => panic!("connect to a missing capture must fail"),
        };

        assert!(error.is_retryable());
        let source = std::error::Error::source(&error)
            .and_then(|source| source.downcast_ref::<PlayerError>());
        assert!(matches!(source, Some(PlayerError::File { .. })), "{error:?}");
    }

    #[test]
    fn oversized_records_are_refused() {
        assert_eq!(record_len(0).unwrap(), 0);
        assert_eq!(record_len(MAX_RECORD_LEN as usize).unwrap(), MAX_RECORD_LEN);
        assert!(matches!(record_len(MAX_RECORD_LEN as usize + 1), Err(PlayerError::Decode { .. })));
        assert!(matches!(record_len(usize::MAX), Err(PlayerError::Decode { .. })));
    }

    #[test]
    fn appended_record_is_length_prefixed() {
        let mut buf = vec![0xEE];
        append_record(&mut buf, &[1, 2, 3]).unwrap();
        assert_eq!(buf, vec![0xEE, 0, 0, 0, 3, 1, 2, 3]);
    }

    #[tokio::test]
    async fn interrupted_reads_lose_no_frames() {
        let frames: Vec<Bytes> =
            (0..4u8).map(|i| FrameTag::Media.build(&vec![i; 256 * 1024])).collect();
        let file = capture(&frames);
        let mut transport = ReplayConnector::new(file.path()).connect("replay://t").await.unwrap();

        let mut replayed = Vec::new();
        for _ in 0..1_000_000 {
            match tokio::time::timeout(Duration::ZERO, transport.next_frame()).await {
                Ok(Ok(Some(frame))) => replayed.push(frame),
                Ok(Ok(None)) => break,
                Ok(Err(e)) => panic!("replay failed: {e}"),
                Err(_) => tokio::task::yield_now().await,
            }
        }

        assert_eq!(replayed, frames);
    }

    #[tokio::test]
    async fn truncated_length_prefix_is_an_error_close() {
        let file = capture(&[FrameTag::Media.build(&[1])]);
        let mut bytes = std::fs::read(file.path()).unwrap();
        bytes.extend_from_slice(&[0, 0]);
        std::fs::write(file.path(), &bytes).unwrap();

        let mut transport = ReplayConnector::new(file.path()).connect("replay://t").await.unwrap();
        assert!(transport.next_frame().await.unwrap().is_some());
        assert!(matches!(transport.next_frame().await, Err(PlayerError::Decode { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_spaces_frames() {
        let frames: Vec<Bytes> = (0..3).map(|i| FrameTag::Media.build(&[i])).collect();
        let file = capture(&frames);
        let connector = ReplayConnector::new(file.path()).with_pacing(Duration::from_millis(40));
        let mut transport = connector.connect("replay://t").await.unwrap();

        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            transport.next_frame().await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
