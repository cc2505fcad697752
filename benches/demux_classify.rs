//! Benchmarks for frame classification
//!
//! Every frame off the wire goes through `classify` on the supervisor task,
//! so its cost bounds how fast a session can keep up with the server:
//! - Media fragments should be a tag check and a refcount bump
//! - Metadata pays for JSON decoding
//! - Codec announcements are rare but measured for completeness

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use wsmp4f::{FrameTag, classify};

fn media_frame(len: usize) -> Bytes {
    let mut frame = vec![0u8; len];
    // moof box header
    frame[..8].copy_from_slice(&[0x00, 0x00, 0x00, 0x68, b'm', b'o', b'o', b'f']);
    Bytes::from(frame)
}

fn metadata_frame() -> Bytes {
    FrameTag::Metadata.build(
        br#"{"id":"cam-1","name":"Front door","at":"2026-10-18T09:12:44Z","observers":{"live":3,"recorder":1}}"#,
    )
}

fn bench_media(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_media");

    for len in [1024usize, 64 * 1024, 1024 * 1024] {
        let frame = media_frame(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &frame, |b, frame| {
            b.iter(|| black_box(classify(black_box(frame.clone()))))
        });
    }

    group.finish();
}

fn bench_control(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_control");

    let metadata = metadata_frame();
    group.bench_function("metadata", |b| {
        b.iter(|| black_box(classify(black_box(metadata.clone()))))
    });

    let codecs = FrameTag::Codec.build(b"avc1.640028,mp4a.40.2");
    group.bench_function("codec", |b| b.iter(|| black_box(classify(black_box(codecs.clone())))));

    group.finish();
}

criterion_group!(benches, bench_media, bench_control);
criterion_main!(benches);
