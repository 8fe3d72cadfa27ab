//! Benchmarks for probe output parsing
//!
//! Measures decoding and pattern extraction over captured ffmpeg stderr.

use audioprobe_av::probe::{OutputParser, Seconds};
use audioprobe_common::AudioFormat;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// A clean mp3 run with progress lines
const MP3_LOG: &str = "ffmpeg version 5.1.6 Copyright (c) 2000-2024 the FFmpeg developers
  built with Apple clang version 15.0.0 (clang-1500.3.9.4)
  configuration: --prefix=/opt/ffmpeg --enable-gpl --enable-libmp3lame
Input #0, mp3, from '/music/album/01 - Opening.mp3':
  Metadata:
    title           : Opening
    artist          : Quartet
    album           : Live
  Duration: 00:03:21.52, start: 0.025057, bitrate: 130 kb/s
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 128 kb/s
Output #0, null, to 'pipe:':
  Stream #0:0: Audio: mp3, 44100 Hz, stereo, fltp, 128 kb/s
Stream mapping:
  Stream #0:0 -> #0:0 (copy)
size=N/A time=00:00:50.00 bitrate=N/A speed= 500x
size=N/A time=00:01:40.00 bitrate=N/A speed= 500x
size=N/A time=00:02:30.00 bitrate=N/A speed= 600x
size=N/A time=00:03:21.50 bitrate=N/A speed= 812x
video:0kB audio:3150kB subtitle:0kB other streams:0kB global headers:0kB muxing overhead: unknown
";

/// A damaged file that trips several warning rules
const NOISY_LOG: &str = "Input #0, mp3, from 'broken.mp3':
[mp3 @ 0x7f8] Format mp3 detected only with low score of 25, misdetection possible!
[mp3 @ 0x7f8] Estimating duration from bitrate, this may be inaccurate
  Duration: 00:41:02.11, start: 1.200000, bitrate: 64 kb/s
  Stream #0:0: Audio: mp3, 22050 Hz, mono, fltp, 64 kb/s
[mp3float @ 0x7f9] Header missing
[mp3float @ 0x7f9] Header missing
[mp3 @ 0x7f8] Invalid data found when processing input
size=N/A time=00:41:02.10 bitrate=N/A speed=1200x
";

fn latin1_log() -> Vec<u8> {
    let mut bytes = b"Input #0, flac, from 'Caf".to_vec();
    bytes.push(0xe9);
    bytes.extend_from_slice(
        b".flac':\n  Duration: 00:02:00.00, bitrate: 900 kb/s\n  Stream #0:0: Audio: flac, 44100 Hz, stereo, s16\nsize=N/A time=00:02:00.00 bitrate=N/A\n",
    );
    bytes
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let parser = OutputParser::new();
    let latin1 = latin1_log();

    for (name, bytes) in [
        ("mp3", MP3_LOG.as_bytes()),
        ("noisy", NOISY_LOG.as_bytes()),
        ("latin1", latin1.as_slice()),
    ] {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("full", name), &bytes, |b, bytes| {
            b.iter(|| parser.parse(black_box(bytes)));
        });
    }

    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let parser = OutputParser::new();

    group.bench_function("extract_fields/mp3", |b| {
        b.iter(|| parser.extract_fields(black_box(MP3_LOG)));
    });

    group.bench_function("extract_warnings/noisy", |b| {
        b.iter(|| parser.extract_warnings(black_box(NOISY_LOG)));
    });

    group.bench_function("detect_fatal/mp3", |b| {
        b.iter(|| parser.detect_fatal(black_box(MP3_LOG)));
    });

    group.finish();
}

fn bench_helpers(c: &mut Criterion) {
    let mut group = c.benchmark_group("helpers");

    group.bench_function("format_list", |b| {
        b.iter(|| AudioFormat::from_format_list(black_box("mov,mp4,m4a,3gp,3g2,mj2")));
    });

    group.bench_function("parse_timestamp", |b| {
        b.iter(|| Seconds::parse_timestamp(black_box("01:02:03.45")));
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_stages, bench_helpers);
criterion_main!(benches);
