#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes through the sidecar reader, both raw and wrapped
    // in a valid gzip envelope so the inner layout parser is reached too.
    // Err results are expected and fine; what we verify is no panics.

    let dir = tempfile::tempdir().unwrap();

    let raw = dir.path().join("raw.idx");
    std::fs::write(&raw, data).unwrap();
    let _ = zseek::read_index(&raw);

    let wrapped = dir.path().join("wrapped.idx");
    let file = std::fs::File::create(&wrapped).unwrap();
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
    enc.write_all(data).unwrap();
    enc.finish().unwrap();
    let _ = zseek::read_index(&wrapped);
});
