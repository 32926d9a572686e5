//! Random-extract latency over an indexed gzip file.
//!
//! Every read restarts DEFLATE from the nearest access point, so the cost of
//! a cold random read is dominated by the skip distance (at most one span).
//! These benches time small and large reads at seeded random offsets.

use std::fs;
use std::io::Write;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use zseek::{build_index, sidecar_path, write_index, GzSeekFile, SPAN};

fn xorshift(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

fn text_corpus(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    let mut out = Vec::with_capacity(len + 16);
    while out.len() < len {
        let word_len = 3 + (xorshift(&mut state) % 7) as usize;
        for _ in 0..word_len {
            out.push(b'a' + (xorshift(&mut state) % 26) as u8);
        }
        out.push(b' ');
    }
    out.truncate(len);
    out
}

fn bench_extract(c: &mut Criterion) {
    const CORPUS: usize = 8 << 20;

    let dir = TempDir::new().unwrap();
    let gz = dir.path().join("bench.gz");
    let file = fs::File::create(&gz).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(&text_corpus(CORPUS, 0xbeba_da55)).unwrap();
    enc.finish().unwrap();

    let index = build_index(&gz, SPAN).unwrap();
    write_index(&index, sidecar_path(&gz)).unwrap();
    let mut handle = GzSeekFile::open(&gz).unwrap();

    let mut group = c.benchmark_group("extract");

    for &size in &[4 * 1024usize, 256 * 1024] {
        let mut buf = vec![0u8; size];
        let mut state = 0x1357_9bdfu32;
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(BenchmarkId::new("random_offset", size), |b| {
            b.iter(|| {
                let t = (xorshift(&mut state) as usize) % (CORPUS - size);
                handle.seek(t as i64);
                handle.read(&mut buf).unwrap()
            })
        });
    }

    // Best case: the offset sits right on an access point, no skip at all.
    let last_out = index.points().last().unwrap().out;
    let mut buf = vec![0u8; 4 * 1024];
    group.bench_function("on_point_4k", |b| {
        b.iter(|| {
            handle.seek(last_out);
            handle.read(&mut buf).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
