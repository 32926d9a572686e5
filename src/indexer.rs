//! Forward indexing pass over a gzip (or zlib) stream.
//!
//! One sequential decompression of the whole stream, driven at DEFLATE block
//! granularity. At each qualifying block boundary the decoder state is
//! distilled into an [`AccessPoint`]: total offsets in both coordinate
//! spaces, the bit alignment into the next block, and a snapshot of the
//! 32 KiB sliding window.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Error;
use crate::index::{AccessPoint, Index, WINSIZE};
use crate::zstream::{Flush, Inflater, Status};

/// Compressed bytes fed to the decoder per file read.
pub(crate) const CHUNK: usize = 16 * 1024;

/// Build an index for the gzip file at `path`.
///
/// `span` is the minimum uncompressed distance between consecutive access
/// points; [`crate::SPAN`] is the usual choice. Smaller spans mean less
/// redundant decoding per random read and a proportionally larger index
/// (each point carries a 32 KiB window).
pub fn build_index<P: AsRef<Path>>(path: P, span: u64) -> Result<Index, Error> {
    let file = File::open(path).map_err(|_| Error::Open)?;
    build_index_from(file, span)
}

/// Build an index from any compressed byte source.
///
/// The stream may carry a gzip or a zlib header (auto-detected). Only the
/// first member is indexed; bytes past its end are ignored.
pub fn build_index_from<R: Read>(mut input: R, span: u64) -> Result<Index, Error> {
    let mut strm = Inflater::gzip_or_zlib()?;
    let mut index = Index::new();

    // Circular output buffer. Writes run to the end, then wrap; at any
    // moment the most recent 32 KiB ends at out_pos.
    let mut window = [0u8; WINSIZE];
    let mut chunk = [0u8; CHUNK];
    let mut out_pos = 0usize;

    let mut totin: i64 = 0; // compressed bytes consumed
    let mut totout: i64 = 0; // uncompressed bytes produced
    let mut last: i64 = 0; // totout at the most recent emission

    'pass: loop {
        let got = input.read(&mut chunk).map_err(|_| Error::Read)?;
        if got == 0 {
            // End of file before end of stream: truncated or empty input.
            return Err(Error::Data);
        }

        let mut in_pos = 0;
        while in_pos < got {
            if out_pos == WINSIZE {
                out_pos = 0;
            }
            let (status, consumed, produced) =
                strm.inflate(&chunk[in_pos..got], &mut window[out_pos..], Flush::Block)?;
            in_pos += consumed;
            totin += consumed as i64;
            out_pos += produced;
            totout += produced as i64;

            match status {
                Status::StreamEnd => break 'pass,
                // Input and output are both non-empty on every call, so a
                // no-progress return means the decoder is wedged.
                Status::BufError => return Err(Error::Zlib),
                Status::Ok => {}
            }

            // The final block is never recorded: a restart there has nothing
            // left to decode.
            if strm.at_end_of_block()
                && !strm.at_last_block()
                && (index.is_empty() || (totout - last) as u64 > span)
            {
                index.push(snapshot(&strm, totin, totout, &window, out_pos));
                last = totout;
            }
        }
    }

    index.trim();
    Ok(index)
}

/// Capture the decoder state at a block boundary as an access point,
/// rotating the circular window into chronological order.
fn snapshot(
    strm: &Inflater,
    totin: i64,
    totout: i64,
    window: &[u8; WINSIZE],
    out_pos: usize,
) -> AccessPoint {
    let mut dict = [0u8; WINSIZE];
    let tail = WINSIZE - out_pos;
    dict[..tail].copy_from_slice(&window[out_pos..]);
    dict[tail..].copy_from_slice(&window[..out_pos]);
    AccessPoint {
        out: totout,
        in_: totin,
        bits: strm.unused_bits(),
        window: dict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Cursor;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn anchor_point_sits_at_zero() {
        let payload = vec![7u8; 256 * 1024];
        let index = build_index_from(Cursor::new(gzip(&payload)), 1 << 20).unwrap();
        assert!(!index.is_empty());
        let first = &index.points()[0];
        assert_eq!(first.out, 0);
        assert_eq!(first.bits, 0, "a fresh member starts byte-aligned");
        assert!(first.in_ > 0, "anchor must sit past the gzip header");
    }

    #[test]
    fn empty_input_is_a_data_error() {
        let err = build_index_from(Cursor::new(Vec::new()), 1 << 20).unwrap_err();
        assert_eq!(err, Error::Data);
    }

    #[test]
    fn truncated_stream_is_a_data_error() {
        let payload = b"zseek ".repeat(100_000);
        let mut compressed = gzip(&payload);
        compressed.truncate(compressed.len() / 2);
        let err = build_index_from(Cursor::new(compressed), 1 << 20).unwrap_err();
        assert_eq!(err, Error::Data);
    }

    #[test]
    fn trailing_member_is_ignored() {
        let mut doubled = gzip(b"first member, and the only one indexed");
        doubled.extend_from_slice(&gzip(b"second member, ignored"));
        let index = build_index_from(Cursor::new(doubled), 0).unwrap();
        assert!(!index.is_empty());
    }

    #[test]
    fn small_spans_emit_more_points() {
        // Incompressible input forces stored blocks and frequent boundaries.
        let mut payload = vec![0u8; 512 * 1024];
        let mut state = 0x2545_f491u32;
        for b in payload.iter_mut() {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *b = state as u8;
        }
        let compressed = gzip(&payload);
        let coarse = build_index_from(Cursor::new(compressed.clone()), 1 << 20).unwrap();
        let fine = build_index_from(Cursor::new(compressed), 64 * 1024).unwrap();
        assert!(fine.len() > coarse.len());
        for pair in fine.points().windows(2) {
            assert!(pair[0].out < pair[1].out);
        }
    }
}
