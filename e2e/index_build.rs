//! E2E Test Suite 01: Index construction
//!
//! Builds indices over gzip fixtures of different shapes and checks the
//! structural invariants: the anchor at offset zero, strict ordering, the
//! span policy, and the bit-alignment range. Extraction fidelity for the
//! same fixtures is covered by suite 02.

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

/// Seeded word-salad corpus. Compresses a few bits per byte, which keeps
/// DEFLATE emitting dynamic blocks every few tens of KiB — the shape the
/// span policy needs in order to place points near the span distance.
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

/// Gzip `payload` into `<dir>/<name>` at the default level.
fn gzip_fixture(dir: &TempDir, name: &str, payload: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let file = fs::File::create(&path).expect("failed to create fixture");
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(payload).expect("failed to compress fixture");
    enc.finish().expect("failed to finish fixture");
    path
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: pattern payload (S1)
// ─────────────────────────────────────────────────────────────────────────────

/// 4 MiB of the repeating pattern "abcdefgh". The payload is so repetitive
/// that a single DEFLATE block can cover megabytes of output, so only the
/// block cadence — not the payload size — decides the point count; what must
/// hold is the anchor plus byte-exact extraction at pattern-aligned offsets.
#[test]
fn test_pattern_payload_index_and_aligned_extracts() {
    let payload: Vec<u8> = b"abcdefgh".iter().copied().cycle().take(4 << 20).collect();
    let dir = TempDir::new().unwrap();
    let gz = gzip_fixture(&dir, "pattern.gz", &payload);

    let index = build_index(&gz, SPAN).expect("failed to build index");
    assert!(index.len() >= 1, "index must hold at least the anchor");
    assert_eq!(index.points()[0].out, 0, "anchor must sit at offset zero");

    write_index(&index, sidecar_path(&gz)).expect("failed to write sidecar");
    let mut handle = GzSeekFile::open(&gz).expect("failed to open handle");

    let mut buf = [0u8; 16];
    handle.seek(0);
    assert_eq!(handle.read(&mut buf).unwrap(), 16);
    assert_eq!(&buf, b"abcdefghabcdefgh");

    let mut buf = [0u8; 8];
    handle.seek(2_097_152);
    assert_eq!(handle.read(&mut buf).unwrap(), 8);
    assert_eq!(&buf, b"abcdefgh");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: multi-span text corpus
// ─────────────────────────────────────────────────────────────────────────────

/// A 4 MiB word-salad corpus produces block boundaries every few tens of
/// KiB, so the span policy must land roughly one point per MiB.
#[test]
fn test_text_corpus_spans_multiple_points() {
    let payload = text_corpus(4 << 20, 0x2545_f491);
    let dir = TempDir::new().unwrap();
    let gz = gzip_fixture(&dir, "text.gz", &payload);

    let index = build_index(&gz, SPAN).expect("failed to build index");
    assert!(
        index.len() >= 3,
        "expected one point per span over 4 MiB, got {}",
        index.len()
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: structural invariants
// ─────────────────────────────────────────────────────────────────────────────

/// Anchor at zero, strictly increasing offsets, bits in range, compressed
/// offsets past the gzip header and increasing alongside.
#[test]
fn test_index_invariants() {
    let payload = text_corpus(3 << 20, 0xdead_beef);
    let dir = TempDir::new().unwrap();
    let gz = gzip_fixture(&dir, "inv.gz", &payload);

    let index = build_index(&gz, SPAN).expect("failed to build index");
    let points = index.points();
    assert_eq!(points[0].out, 0);
    assert!(points[0].in_ > 0, "anchor lies past the gzip header");

    for pair in points.windows(2) {
        assert!(pair[0].out < pair[1].out, "out offsets must strictly increase");
        assert!(pair[0].in_ <= pair[1].in_, "in offsets must not decrease");
    }
    for point in points {
        assert!(point.bits <= 7, "bits out of range: {}", point.bits);
    }
}

/// Span policy: consecutive points are more than SPAN apart (the policy
/// waits for the span to elapse) but by no more than one block's worth of
/// overshoot past it.
#[test]
fn test_span_policy_spacing() {
    let payload = text_corpus(4 << 20, 0x0bad_cafe);
    let dir = TempDir::new().unwrap();
    let gz = gzip_fixture(&dir, "span.gz", &payload);

    let index = build_index(&gz, SPAN).expect("failed to build index");
    for pair in index.points().windows(2) {
        let delta = (pair[1].out - pair[0].out) as u64;
        assert!(delta > SPAN, "points closer than the span: {}", delta);
        assert!(delta < 2 * SPAN, "span overshoot too large: {}", delta);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: single-span payload (S3)
// ─────────────────────────────────────────────────────────────────────────────

/// A payload no larger than one span never satisfies `totout - last > SPAN`,
/// so exactly the anchor remains.
#[test]
fn test_single_span_payload_has_only_the_anchor() {
    let payload = text_corpus(1 << 20, 0x1234_5678);
    let dir = TempDir::new().unwrap();
    let gz = gzip_fixture(&dir, "one.gz", &payload);

    let index = build_index(&gz, SPAN).expect("failed to build index");
    assert_eq!(index.len(), 1);
    assert_eq!(index.points()[0].out, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: smaller spans, denser index
// ─────────────────────────────────────────────────────────────────────────────

/// Shrinking the span parameter must produce a strictly denser index over
/// the same compressed input.
#[test]
fn test_span_parameter_controls_density() {
    let payload = text_corpus(2 << 20, 0x00c0_ffee);
    let dir = TempDir::new().unwrap();
    let gz = gzip_fixture(&dir, "dense.gz", &payload);

    let coarse = build_index(&gz, SPAN).expect("failed to build coarse index");
    let fine = build_index(&gz, 128 * 1024).expect("failed to build fine index");
    assert!(
        fine.len() > coarse.len(),
        "fine {} vs coarse {}",
        fine.len(),
        coarse.len()
    );
}
