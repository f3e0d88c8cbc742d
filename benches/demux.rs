//! NDJSON demuxer throughput benchmarks
//!
//! Measures line re-framing cost as a function of transport frame size:
//! small frames stress the carry-over path, large frames the multi-line
//! split path.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ollamactl::stream::LineDemuxer;

/// Build a payload of `records` chat-style NDJSON lines
fn synthetic_ndjson(records: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..records {
        out.extend_from_slice(
            format!("{{\"message\":{{\"content\":\"token-{i}\"}},\"done\":false}}\n").as_bytes(),
        );
    }
    out
}

fn bench_demux_frame_sizes(c: &mut Criterion) {
    let payload = synthetic_ndjson(1000);
    let mut group = c.benchmark_group("demux_frame_size");

    for frame_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::new("bytes", frame_size),
            &frame_size,
            |b, &frame_size| {
                b.iter(|| {
                    let mut demux = LineDemuxer::new();
                    let mut lines = 0usize;
                    for frame in payload.chunks(frame_size) {
                        lines += demux.push(black_box(frame)).len();
                    }
                    lines
                });
            },
        );
    }
    group.finish();
}

fn bench_demux_single_frame(c: &mut Criterion) {
    let payload = synthetic_ndjson(1000);

    c.bench_function("demux_single_frame", |b| {
        b.iter(|| LineDemuxer::new().push(black_box(&payload)).len());
    });
}

criterion_group!(benches, bench_demux_frame_sizes, bench_demux_single_frame);
criterion_main!(benches);
