//! Decoder throughput benchmarks.
//!
//! ## Running the benchmarks
//!
//! ```bash
//! cargo bench -p usc-protocol
//! ```
//!
//! ## Benchmarks included
//!
//! - `process/<frame>` - Byte-at-a-time decoding of a single frame
//! - `params/iterate_N` - Walking a frame with N parameters
//! - `codec/stream_N` - Pushing N frames through the message codec

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use usc_protocol::{Command, CommandBuilder, CommandConfig, MessageCodec, Status};

fn frame_with_params(count: usize) -> Vec<u8> {
    let mut builder = CommandBuilder::new(&[1]).component(3).action("w");
    for i in 0..count {
        builder = builder.param(format!("k{}", i), format!("v{}&{}", i, i * 7));
    }
    builder.with_checksum().encode().expect("valid command").to_vec()
}

/// Benchmark decoding representative frames.
fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");

    let frames: [(&str, Vec<u8>); 4] = [
        ("short", b"!1:10/s$".to_vec()),
        ("params", b"!1:3/w?0=1&1=2$".to_vec()),
        ("checksum", frame_with_params(4)),
        ("response", b"@t=21.5&h=40\\$\\n$".to_vec()),
    ];

    for (name, frame) in frames.iter() {
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), frame, |b, frame| {
            let mut command = Command::new(CommandConfig::default());
            b.iter(|| {
                let mut status = Status::Next;
                for &byte in frame.iter() {
                    status = command.process(black_box(byte)).expect("valid frame");
                }
                black_box(status)
            });
        });
    }

    group.finish();
}

/// Benchmark parameter iteration over a decoded frame.
fn bench_params(c: &mut Criterion) {
    let mut group = c.benchmark_group("params");

    for count in [1, 4, 8].iter() {
        let frame = frame_with_params(*count);
        let mut command = Command::new(CommandConfig::default().with_capacity(256));
        let (_, result) = command.process_slice(&frame);
        assert_eq!(result, Ok(Status::Complete));

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("iterate", count), count, |b, _| {
            b.iter(|| {
                let sum: i64 = command.params().map(|kv| kv.value_long(0)).sum();
                black_box(sum)
            });
        });
    }

    group.finish();
}

/// Benchmark the owned-message codec on a stream of frames.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for count in [16, 128].iter() {
        let stream: Vec<u8> = (0..*count)
            .flat_map(|i| frame_with_params(i % 4 + 1))
            .collect();

        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::new("stream", count), &stream, |b, stream| {
            b.iter(|| {
                let mut codec = MessageCodec::new(CommandConfig::default().with_capacity(256));
                codec.push(black_box(stream));
                let mut decoded = 0;
                while let Some(message) = codec.decode() {
                    if message.is_ok() {
                        decoded += 1;
                    }
                }
                black_box(decoded)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process, bench_params, bench_codec);
criterion_main!(benches);
