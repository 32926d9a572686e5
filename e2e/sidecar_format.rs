//! E2E Test Suite 03: Sidecar format
//!
//! The sidecar layout is a wire contract: gzip-wrapped, `ZSEK` magic, a
//! 32-bit offset-width guard, a 32-bit count, then fixed-layout records with
//! little-endian integers and raw 32 KiB windows. These tests check the
//! write→read round trip, the exact byte layout, and rejection of
//! incompatible or damaged sidecars.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use zseek::{build_index, read_index, sidecar_path, write_index, Error, Index, SPAN, WINSIZE};

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

/// Build an index over a multi-span gzip fixture.
fn built_index(dir: &TempDir) -> Index {
    let path = dir.path().join("corpus.gz");
    let file = fs::File::create(&path).expect("failed to create fixture");
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(&text_corpus(3 << 20, 0x5eed_5eed))
        .expect("failed to compress fixture");
    enc.finish().expect("failed to finish fixture");
    build_index(&path, SPAN).expect("failed to build index")
}

/// Write raw bytes into a gzip-wrapped sidecar file.
fn write_raw_sidecar(path: &Path, inner: &[u8]) {
    let file = fs::File::create(path).expect("failed to create sidecar");
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(inner).expect("failed to write sidecar");
    enc.finish().expect("failed to finish sidecar");
}

/// Decompress a sidecar file back to its inner byte stream.
fn read_raw_sidecar(path: &Path) -> Vec<u8> {
    let file = fs::File::open(path).expect("failed to open sidecar");
    let mut inner = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut inner)
        .expect("failed to decompress sidecar");
    inner
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: write → read round trip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_round_trip_preserves_every_record() {
    let dir = TempDir::new().unwrap();
    let index = built_index(&dir);
    assert!(index.len() >= 2, "fixture must span several points");

    let sidecar = dir.path().join("corpus.gz.idx");
    write_index(&index, &sidecar).expect("failed to write sidecar");
    let loaded = read_index(&sidecar).expect("failed to read sidecar");

    // Record-for-record equality, windows included.
    assert_eq!(loaded, index);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: exact byte layout
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_on_disk_layout_is_byte_exact() {
    let dir = TempDir::new().unwrap();
    let index = built_index(&dir);
    let sidecar = dir.path().join("layout.idx");
    write_index(&index, &sidecar).expect("failed to write sidecar");

    let raw = read_raw_sidecar(&sidecar);
    const RECORD: usize = 8 + 8 + 4 + WINSIZE;
    assert_eq!(raw.len(), 12 + index.len() * RECORD);

    assert_eq!(&raw[0..4], b"ZSEK");
    assert_eq!(u32::from_le_bytes(raw[4..8].try_into().unwrap()), 8);
    assert_eq!(
        u32::from_le_bytes(raw[8..12].try_into().unwrap()),
        index.len() as u32
    );

    for (i, point) in index.points().iter().enumerate() {
        let rec = &raw[12 + i * RECORD..12 + (i + 1) * RECORD];
        assert_eq!(i64::from_le_bytes(rec[0..8].try_into().unwrap()), point.out);
        assert_eq!(i64::from_le_bytes(rec[8..16].try_into().unwrap()), point.in_);
        assert_eq!(
            i32::from_le_bytes(rec[16..20].try_into().unwrap()),
            point.bits as i32
        );
        assert_eq!(&rec[20..], &point.window[..]);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: incompatible sidecars (S5, off_size guard)
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_wrong_magic_is_incompatible() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("badmagic.idx");

    let mut inner = Vec::new();
    inner.extend_from_slice(b"ZSEX");
    inner.extend_from_slice(&8u32.to_le_bytes());
    inner.extend_from_slice(&0u32.to_le_bytes());
    write_raw_sidecar(&path, &inner);

    assert_eq!(read_index(&path).unwrap_err(), Error::Incompatible);
}

#[test]
fn test_wrong_offset_width_is_incompatible() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("badwidth.idx");

    // A 32-bit-built sidecar: off_size = 4.
    let mut inner = Vec::new();
    inner.extend_from_slice(b"ZSEK");
    inner.extend_from_slice(&4u32.to_le_bytes());
    inner.extend_from_slice(&0u32.to_le_bytes());
    write_raw_sidecar(&path, &inner);

    assert_eq!(read_index(&path).unwrap_err(), Error::Incompatible);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: damaged sidecars
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_truncated_sidecar_is_a_zlib_error() {
    let dir = TempDir::new().unwrap();
    let index = built_index(&dir);
    let sidecar = dir.path().join("trunc.idx");
    write_index(&index, &sidecar).expect("failed to write sidecar");

    let mut bytes = fs::read(&sidecar).unwrap();
    bytes.truncate(bytes.len() / 2);
    fs::write(&sidecar, &bytes).unwrap();

    assert_eq!(read_index(&sidecar).unwrap_err(), Error::Zlib);
}

#[test]
fn test_record_count_overrunning_the_stream_is_a_zlib_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("overrun.idx");

    // Header promises one record but the stream ends immediately.
    let mut inner = Vec::new();
    inner.extend_from_slice(b"ZSEK");
    inner.extend_from_slice(&8u32.to_le_bytes());
    inner.extend_from_slice(&1u32.to_le_bytes());
    write_raw_sidecar(&path, &inner);

    assert_eq!(read_index(&path).unwrap_err(), Error::Zlib);
}

#[test]
fn test_out_of_range_bits_is_a_data_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("badbits.idx");

    let mut inner = Vec::new();
    inner.extend_from_slice(b"ZSEK");
    inner.extend_from_slice(&8u32.to_le_bytes());
    inner.extend_from_slice(&1u32.to_le_bytes());
    inner.extend_from_slice(&0i64.to_le_bytes());
    inner.extend_from_slice(&20i64.to_le_bytes());
    inner.extend_from_slice(&9i32.to_le_bytes()); // bits must be 0..=7
    inner.extend_from_slice(&[0u8; WINSIZE]);
    write_raw_sidecar(&path, &inner);

    assert_eq!(read_index(&path).unwrap_err(), Error::Data);
}

#[test]
fn test_unordered_records_are_a_data_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unordered.idx");

    let mut inner = Vec::new();
    inner.extend_from_slice(b"ZSEK");
    inner.extend_from_slice(&8u32.to_le_bytes());
    inner.extend_from_slice(&2u32.to_le_bytes());
    for out in [5000i64, 4000i64] {
        inner.extend_from_slice(&out.to_le_bytes());
        inner.extend_from_slice(&100i64.to_le_bytes());
        inner.extend_from_slice(&0i32.to_le_bytes());
        inner.extend_from_slice(&[0u8; WINSIZE]);
    }
    write_raw_sidecar(&path, &inner);

    assert_eq!(read_index(&path).unwrap_err(), Error::Data);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: sidecar naming
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sidecar_path_appends_the_suffix() {
    assert_eq!(
        sidecar_path(Path::new("dir/archive.gz")),
        PathBuf::from("dir/archive.gz.idx")
    );
}
