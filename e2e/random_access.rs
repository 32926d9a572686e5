//! E2E Test Suite 02: Random-access fidelity
//!
//! The central property: for any offset and length, bytes read through the
//! index equal the same slice of a sequential decode. Exercised over a
//! seeded incompressible corpus (stored blocks, byte-aligned restarts) and a
//! compressible text corpus (dynamic blocks, mid-byte restarts), plus the
//! seek/tell/read offset contracts.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use zseek::{build_index, sidecar_path, write_index, GzSeekFile, SPAN};

// ─────────────────────────────────────────────────────────────────────────────
// Fixture helpers
// ─────────────────────────────────────────────────────────────────────────────

fn xorshift(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

/// Seeded incompressible bytes; DEFLATE falls back to stored blocks.
fn random_bytes(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len).map(|_| xorshift(&mut state) as u8).collect()
}

/// Seeded compressible word salad; DEFLATE emits dynamic blocks whose
/// boundaries usually land mid-byte, exercising the priming path.
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

/// Gzip `payload` into the directory, build and persist its index, and
/// return the compressed path.
fn indexed_fixture(dir: &TempDir, name: &str, payload: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let file = fs::File::create(&path).expect("failed to create fixture");
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(payload).expect("failed to compress fixture");
    enc.finish().expect("failed to finish fixture");

    let index = build_index(&path, SPAN).expect("failed to build index");
    write_index(&index, sidecar_path(&path)).expect("failed to write sidecar");
    path
}

/// Read `len` bytes at `offset` through the handle.
fn read_at(handle: &mut GzSeekFile, offset: i64, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    handle.seek(offset);
    let got = handle.read(&mut buf).expect("read failed");
    buf.truncate(got);
    buf
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: seeded random offsets over a 10 MB incompressible corpus (S2)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_random_pairs_match_the_payload() {
    let payload = random_bytes(10_000_000, 0x9e37_79b9);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "rand.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    let mut state = 0x51_7cc1u32;
    for round in 0..100 {
        let t = (xorshift(&mut state) as usize) % payload.len();
        let n = 1 + (xorshift(&mut state) as usize) % 65536;
        let got = read_at(&mut handle, t as i64, n);
        let want = &payload[t..payload.len().min(t + n)];
        assert_eq!(got, want, "round {}: mismatch at t={} n={}", round, t, n);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: reads straddling every access point of a compressible corpus
// ─────────────────────────────────────────────────────────────────────────────

/// Mid-byte restarts are the hard case: each access point of a text corpus
/// is probed exactly at its own offset, one byte before, and one byte after,
/// so the prime-and-dictionary path is hit for every recorded alignment.
#[test]
fn test_reads_around_every_access_point() {
    let payload = text_corpus(5 << 20, 0xfeed_f00d);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "text.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    let outs: Vec<i64> = handle.index().points().iter().map(|p| p.out).collect();
    assert!(outs.len() >= 3, "need several points for this probe");

    for out in outs {
        for t in [out - 1, out, out + 1] {
            if t < 0 {
                continue;
            }
            let got = read_at(&mut handle, t, 4096);
            let t = t as usize;
            let want = &payload[t..payload.len().min(t + 4096)];
            assert_eq!(got, want, "mismatch around access point at {}", t);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: seek / tell / offset advancement
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_seek_then_tell_round_trips() {
    let payload = random_bytes(64 * 1024, 1);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "seek.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    assert_eq!(handle.tell(), 0);
    for t in [0, 1, 4096, 1 << 40, -3] {
        handle.seek(t);
        assert_eq!(handle.tell(), t);
    }
}

#[test]
fn test_read_advances_offset_by_the_returned_count() {
    let payload = random_bytes(256 * 1024, 2);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "adv.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    handle.seek(1000);
    let mut buf = [0u8; 300];
    let k = handle.read(&mut buf).unwrap();
    assert_eq!(k, 300);
    assert_eq!(handle.tell(), 1300);

    // Consecutive reads are contiguous.
    let mut next = [0u8; 300];
    let k = handle.read(&mut next).unwrap();
    assert_eq!(k, 300);
    assert_eq!(handle.tell(), 1600);
    assert_eq!(&next[..], &payload[1300..1600]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: end-of-stream behavior (S6)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_read_past_the_end_returns_zero_and_keeps_tell() {
    let payload = random_bytes(100_000, 3);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "eos.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    let beyond = payload.len() as i64 + 12345;
    handle.seek(beyond);
    let mut buf = [0u8; 1];
    assert_eq!(handle.read(&mut buf).unwrap(), 0);
    assert_eq!(handle.tell(), beyond, "a zero read must not move the offset");

    // Exactly at the end: also zero.
    handle.seek(payload.len() as i64);
    assert_eq!(handle.read(&mut buf).unwrap(), 0);
}

#[test]
fn test_read_crossing_the_end_returns_the_partial_tail() {
    let payload = random_bytes(100_000, 4);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "tail.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    handle.seek(payload.len() as i64 - 10);
    let mut buf = [0u8; 64];
    let k = handle.read(&mut buf).unwrap();
    assert_eq!(k, 10, "short count signals end of stream");
    assert_eq!(&buf[..10], &payload[payload.len() - 10..]);
    assert_eq!(handle.tell(), payload.len() as i64);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: degenerate requests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_buffer_reads_zero() {
    let payload = random_bytes(10_000, 5);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "zero.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    let mut empty = [0u8; 0];
    assert_eq!(handle.read(&mut empty).unwrap(), 0);
    assert_eq!(handle.tell(), 0);
}

#[test]
fn test_negative_offset_reads_zero() {
    let payload = random_bytes(10_000, 6);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "neg.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    handle.seek(-1);
    let mut buf = [0u8; 8];
    assert_eq!(handle.read(&mut buf).unwrap(), 0, "no point precedes a negative offset");
    assert_eq!(handle.tell(), -1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 6: std::io::Read adapter
// ─────────────────────────────────────────────────────────────────────────────

/// The handle doubles as an io::Read, so seek-then-read_to_end drains the
/// stream from the logical offset.
#[test]
fn test_io_read_adapter_streams_the_tail() {
    use std::io::Read;

    let payload = text_corpus(200_000, 0xabad_1dea);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "adapter.gz", &payload);
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    handle.seek(150_000);
    let mut tail = Vec::new();
    handle.read_to_end(&mut tail).expect("read_to_end failed");
    assert_eq!(tail, &payload[150_000..]);
}
