//! E2E Test Suite 04: Error handling
//!
//! Failure paths across build, open, and read: missing files, truncated and
//! corrupted compressed input, and the contract that a failing read leaves
//! the handle usable with its offset unmoved.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use zseek::{build_index, sidecar_path, write_index, Error, GzSeekFile, SPAN};

// ─────────────────────────────────────────────────────────────────────────────
// Fixture helpers
// ─────────────────────────────────────────────────────────────────────────────

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

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: build failures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_build_on_a_missing_file_is_an_open_error() {
    let dir = TempDir::new().unwrap();
    let err = build_index(dir.path().join("absent.gz"), SPAN).unwrap_err();
    assert_eq!(err, Error::Open);
}

#[test]
fn test_build_on_an_empty_file_is_a_data_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.gz");
    fs::write(&path, b"").unwrap();
    assert_eq!(build_index(&path, SPAN).unwrap_err(), Error::Data);
}

#[test]
fn test_build_on_a_non_gzip_file_is_a_data_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.gz");
    fs::write(&path, b"this is not a gzip stream at all").unwrap();
    assert_eq!(build_index(&path, SPAN).unwrap_err(), Error::Data);
}

#[test]
fn test_build_on_a_truncated_stream_is_a_data_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trunc.gz");
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&text_corpus(512 * 1024, 11)).unwrap();
    let mut compressed = enc.finish().unwrap();
    compressed.truncate(compressed.len() / 2);
    fs::write(&path, &compressed).unwrap();

    assert_eq!(build_index(&path, SPAN).unwrap_err(), Error::Data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: open failures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_open_without_a_sidecar_is_an_open_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noidx.gz");
    let file = fs::File::create(&path).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(b"indexed never").unwrap();
    enc.finish().unwrap();

    assert_eq!(GzSeekFile::open(&path).unwrap_err(), Error::Open);
}

#[test]
fn test_open_with_a_sidecar_but_no_data_file_is_an_open_error() {
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "data.gz", &text_corpus(64 * 1024, 12));
    fs::remove_file(&gz).unwrap();
    assert_eq!(GzSeekFile::open(&gz).unwrap_err(), Error::Open);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: corruption after indexing (S4)
// ─────────────────────────────────────────────────────────────────────────────

/// Clobber compressed bytes shortly after the last access point. Reads that
/// restart before the damage and decode through it must fail; reads served
/// entirely from earlier regions must still succeed; and the failing read
/// must leave the handle usable with its offset unmoved.
#[test]
fn test_corruption_fails_locally_and_leaves_the_handle_usable() {
    let payload = text_corpus(4 << 20, 0xc0de_c0de);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "corrupt.gz", &payload);

    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");
    let last = handle.index().points().last().cloned().expect("have points");
    assert!(last.out > 0, "fixture must span several points");

    // Damage 16 compressed bytes just past the last restart point.
    let mut compressed = fs::read(&gz).unwrap();
    let at = last.in_ as usize + 64;
    assert!(at + 16 < compressed.len());
    for b in &mut compressed[at..at + 16] {
        *b = 0xff;
    }
    fs::write(&gz, &compressed).unwrap();

    // Reopen so the handle sees the damaged file.
    let mut handle = GzSeekFile::open(&gz).expect("failed to reopen handle");

    // A read decoding through the damaged region fails...
    handle.seek(last.out);
    let mut buf = vec![0u8; 256 * 1024];
    let err = handle.read(&mut buf).expect_err("decode must hit the damage");
    assert!(
        err == Error::Data || err == Error::Zlib,
        "unexpected kind: {:?}",
        err
    );
    assert_eq!(handle.tell(), last.out, "a failing read must not move the offset");

    // ...while the start of the stream is untouched.
    handle.seek(0);
    let mut head = vec![0u8; 4096];
    assert_eq!(handle.read(&mut head).unwrap(), 4096);
    assert_eq!(&head[..], &payload[..4096]);

    // The handle carries no latched error state.
    assert_eq!(handle.tell(), 4096);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: compressed file truncated after indexing
// ─────────────────────────────────────────────────────────────────────────────

/// Chopping the compressed tail makes late reads fail with a data error
/// (the stream claims more than the file holds) while early reads work.
#[test]
fn test_truncated_data_file_fails_late_reads() {
    let payload = text_corpus(3 << 20, 0x7007_7007);
    let dir = TempDir::new().unwrap();
    let gz = indexed_fixture(&dir, "shorter.gz", &payload);

    let mut compressed = fs::read(&gz).unwrap();
    compressed.truncate(compressed.len() - 16384);
    fs::write(&gz, &compressed).unwrap();

    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    handle.seek(0);
    let mut head = vec![0u8; 4096];
    assert_eq!(handle.read(&mut head).unwrap(), 4096);

    handle.seek(payload.len() as i64 - 8192);
    let mut tail = vec![0u8; 8192];
    assert_eq!(handle.read(&mut tail).unwrap_err(), Error::Data);
}
