//! End-to-end playback through the public API

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use wsmp4f::transports::{ChannelConnector, ReplayConnector, append_record};
use wsmp4f::{
    AppendNotifier, AppendSink, Codecs, FrameTag, LivePlayer, OutputSurface, PlaybackEvent,
    PlaybackSession, PlayerConfig, SessionState,
};

#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Sink(String),
    Chunk(Bytes),
    Released(u64),
}

#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<Seen>>>);

impl Log {
    fn push(&self, seen: Seen) {
        self.0.lock().unwrap().push(seen);
    }

    fn snapshot(&self) -> Vec<Seen> {
        self.0.lock().unwrap().clone()
    }

    fn chunks(&self) -> Vec<Bytes> {
        self.snapshot()
            .into_iter()
            .filter_map(|seen| match seen {
                Seen::Chunk(chunk) => Some(chunk),
                _ => None,
            })
            .collect()
    }
}

/// Surface whose sinks complete every append immediately
struct InstantSurface {
    log: Log,
}

impl OutputSurface for InstantSurface {
    fn create_sink(
        &mut self,
        codecs: &Codecs,
        notifier: AppendNotifier,
    ) -> wsmp4f::Result<Box<dyn AppendSink>> {
        self.log.push(Seen::Sink(codecs.to_string()));
        Ok(Box::new(InstantSink { notifier, log: self.log.clone() }))
    }
}

struct InstantSink {
    notifier: AppendNotifier,
    log: Log,
}

impl AppendSink for InstantSink {
    fn append(&mut self, chunk: Bytes) -> wsmp4f::Result<()> {
        self.log.push(Seen::Chunk(chunk));
        self.notifier.complete();
        Ok(())
    }

    fn release(&mut self) {
        self.log.push(Seen::Released(self.notifier.generation()));
    }
}

async fn next_matching<F>(events: &mut broadcast::Receiver<PlaybackEvent>, matches: F) -> PlaybackEvent
where
    F: Fn(&PlaybackEvent) -> bool,
{
    loop {
        let event = events.recv().await.expect("event stream ended");
        if matches(&event) {
            return event;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn switching_sources_hands_the_surface_to_the_new_session() {
    let (connector, mut incoming) = ChannelConnector::new();
    let log = Log::default();
    let mut player =
        LivePlayer::new(connector, InstantSurface { log: log.clone() }, PlayerConfig::default())
            .unwrap();

    let mut events = player.load("ws://nvr.local/livestreams/cam-1/wsmp4f").await.unwrap().subscribe();
    let first = incoming.accept().await.unwrap();
    assert_eq!(first.url, "ws://nvr.local/livestreams/cam-1/wsmp4f");

    first.feed.send(FrameTag::Codec.build(b"avc1.64001f"));
    first.feed.send(Bytes::from_static(&[0x00, 0x01]));
    next_matching(&mut events, |e| matches!(e, PlaybackEvent::CodecChanged(_))).await;
    while log.chunks().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    player.load("ws://nvr.local/livestreams/cam-2/wsmp4f").await.unwrap();
    assert_eq!(player.url(), Some("ws://nvr.local/livestreams/cam-2/wsmp4f"));
    assert!(first.feed.is_closed(), "old transport must be closed before switching");

    let mut events = player.session().unwrap().subscribe();
    let second = incoming.accept().await.unwrap();
    assert_eq!(second.url, "ws://nvr.local/livestreams/cam-2/wsmp4f");
    second.feed.send(FrameTag::Codec.build(b"hvc1.1.6.L93.B0"));
    second.feed.send(Bytes::from_static(&[0x00, 0x02]));
    next_matching(&mut events, |e| matches!(e, PlaybackEvent::CodecChanged(_))).await;
    while log.chunks().len() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    player.stop().await.unwrap();
    assert!(player.session().is_none());

    let seen = log.snapshot();
    let first_release = seen.iter().position(|s| matches!(s, Seen::Released(_))).unwrap();
    let second_sink = seen.iter().rposition(|s| matches!(s, Seen::Sink(_))).unwrap();
    assert!(first_release < second_sink, "one sink at a time: {seen:?}");
    assert_eq!(
        seen.iter().filter(|s| matches!(s, Seen::Sink(_))).cloned().collect::<Vec<_>>(),
        vec![Seen::Sink("avc1.64001f".into()), Seen::Sink("hvc1.1.6.L93.B0".into())]
    );
    assert_eq!(
        log.chunks(),
        vec![Bytes::from_static(&[0x00, 0x01]), Bytes::from_static(&[0x00, 0x02])]
    );
}

#[tokio::test(start_paused = true)]
async fn stopping_an_idle_player_is_a_no_op() {
    let (connector, _incoming) = ChannelConnector::new();
    let mut player =
        LivePlayer::new(connector, InstantSurface { log: Log::default() }, PlayerConfig::default())
            .unwrap();

    player.stop().await.unwrap();
    player.stop().await.unwrap();
    assert!(player.url().is_none());
}

#[tokio::test(start_paused = true)]
async fn recorded_capture_plays_and_reconnects_at_end() {
    let mut capture = Vec::new();
    append_record(&mut capture, &FrameTag::Codec.build(b"avc1.640028,mp4a.40.2")).unwrap();
    append_record(&mut capture, &FrameTag::Metadata.build(br#"{"id":"cam-7","name":"Yard","observers":{"live":2}}"#)).unwrap();
    append_record(&mut capture, &[0x00, 0x10, 0x20]).unwrap();
    append_record(&mut capture, &FrameTag::Metadata.build(br#"{"id":"cam-7","name":"Yard","observers":{"live":3}}"#)).unwrap();
    append_record(&mut capture, &[0x00, 0x11, 0x21]).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&capture).unwrap();
    file.flush().unwrap();

    let log = Log::default();
    let session = PlaybackSession::start(
        "file://capture",
        ReplayConnector::new(file.path()),
        InstantSurface { log: log.clone() },
        PlayerConfig::default(),
    )
    .unwrap();
    let mut events = session.subscribe();

    let reconnecting =
        next_matching(&mut events, |e| matches!(e, PlaybackEvent::Reconnecting { .. })).await;
    assert_eq!(reconnecting, PlaybackEvent::Reconnecting { delay: Duration::from_millis(3000) });
    assert_eq!(session.state(), SessionState::ReconnectPending);

    assert_eq!(
        log.chunks(),
        vec![Bytes::from_static(&[0x00, 0x10, 0x20]), Bytes::from_static(&[0x00, 0x11, 0x21])]
    );
    let metadata = session.current_metadata().unwrap();
    assert_eq!(metadata.id, "cam-7");
    assert_eq!(metadata.observer_total(), 3);

    // Replayed again after the delay, on a fresh sink
    next_matching(&mut events, |e| matches!(e, PlaybackEvent::CodecChanged(_))).await;
    assert_eq!(log.snapshot().iter().filter(|s| matches!(s, Seen::Sink(_))).count(), 2);

    session.shutdown().await.unwrap();
}
