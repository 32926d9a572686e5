//! E2E Test Suite 05: CLI integration
//!
//! Tests the `zseek` binary as a black box using std::process::Command:
//! build mode, every extraction range form, exit codes, and stderr
//! phrasings.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

// ─────────────────────────────────────────────────────────────────────────────
// Harness helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Locate the `zseek` binary produced by Cargo.
fn zseek_bin() -> PathBuf {
    // CARGO_BIN_EXE_zseek is set by Cargo when running integration tests.
    // Fall back to walking up from the test binary location.
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_zseek") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop();
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("zseek");
    p
}

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

/// Create a gzip fixture and return its path plus the payload.
fn make_fixture(dir: &TempDir) -> (PathBuf, Vec<u8>) {
    let payload = text_corpus(300_000, 0x0123_4567);
    let path = dir.path().join("input.gz");
    let file = fs::File::create(&path).unwrap();
    let mut enc = GzEncoder::new(file, Compression::default());
    enc.write_all(&payload).unwrap();
    enc.finish().unwrap();
    (path, payload)
}

/// Run `zseek -b` on the fixture and assert success.
fn build(path: &PathBuf) {
    let status = Command::new(zseek_bin())
        .args(["-b", path.to_str().unwrap()])
        .status()
        .expect("failed to run zseek -b");
    assert!(status.success(), "build step should exit 0");
}

/// Run an extraction and return (exit ok, stdout bytes).
fn extract(path: &PathBuf, range: &str) -> (bool, Vec<u8>) {
    let output = Command::new(zseek_bin())
        .args([path.to_str().unwrap(), range])
        .output()
        .expect("failed to run zseek extract");
    (output.status.success(), output.stdout)
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: build then extract round trip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_build_writes_the_sidecar() {
    let dir = TempDir::new().unwrap();
    let (gz, _) = make_fixture(&dir);
    build(&gz);

    let idx = dir.path().join("input.gz.idx");
    assert!(idx.exists(), "sidecar should exist next to the input");

    // Rebuilding overwrites the sidecar in place.
    build(&gz);
    assert!(idx.exists());
}

#[test]
fn test_cli_extracts_every_range_form() {
    let dir = TempDir::new().unwrap();
    let (gz, payload) = make_fixture(&dir);
    build(&gz);

    // BEGIN-END (half-open)
    let (ok, out) = extract(&gz, "1000-2000");
    assert!(ok);
    assert_eq!(out, &payload[1000..2000]);

    // -END
    let (ok, out) = extract(&gz, "-64");
    assert!(ok);
    assert_eq!(out, &payload[..64]);

    // BEGIN- (to end of stream)
    let (ok, out) = extract(&gz, "295000-");
    assert!(ok);
    assert_eq!(out, &payload[295_000..]);

    // Bare N (a single byte)
    let (ok, out) = extract(&gz, "12345");
    assert!(ok);
    assert_eq!(out, &payload[12_345..12_346]);
}

#[test]
fn test_cli_range_past_the_end_is_empty_but_successful() {
    let dir = TempDir::new().unwrap();
    let (gz, payload) = make_fixture(&dir);
    build(&gz);

    let begin = payload.len() + 5000;
    let (ok, out) = extract(&gz, &format!("{}-", begin));
    assert!(ok, "reading past the end is not an error");
    assert!(out.is_empty());

    // A range straddling the end yields the partial tail.
    let (ok, out) = extract(&gz, &format!("{}-{}", payload.len() - 10, begin));
    assert!(ok);
    assert_eq!(out, &payload[payload.len() - 10..]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: exit codes and stderr phrasing
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_bad_usage_exits_one() {
    for argv in [
        &[] as &[&str],
        &["onlyfile.gz"],
        &["file.gz", "10-5"],
        &["file.gz", "abc"],
        &["--bogus", "file.gz", "1-2"],
        &["-b"],
    ] {
        let output = Command::new(zseek_bin())
            .args(argv)
            .output()
            .expect("failed to run zseek");
        assert_eq!(output.status.code(), Some(1), "argv {:?}", argv);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("bad usage"), "stderr was: {}", stderr);
    }
}

#[test]
fn test_cli_missing_input_exits_one() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.gz");

    let output = Command::new(zseek_bin())
        .args(["-b", absent.to_str().unwrap()])
        .output()
        .expect("failed to run zseek -b");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to open"), "stderr was: {}", stderr);
}

#[test]
fn test_cli_extract_without_an_index_exits_one() {
    let dir = TempDir::new().unwrap();
    let (gz, _) = make_fixture(&dir);
    // No build step.
    let (ok, _) = extract(&gz, "0-10");
    assert!(!ok, "extraction without a sidecar must fail");
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: --version and --help
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_version_and_help_exit_zero() {
    for flag in ["--version", "-V", "--help", "-h"] {
        let output = Command::new(zseek_bin())
            .arg(flag)
            .output()
            .expect("failed to run zseek");
        assert!(output.status.success(), "{} should exit 0", flag);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("zseek"), "{} stdout was: {}", flag, stdout);
    }
}
