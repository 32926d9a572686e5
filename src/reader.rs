//! Random-access reader over an indexed gzip file.
//!
//! [`GzSeekFile`] owns the opened compressed file and its loaded index, and
//! exposes seek/tell/read in uncompressed coordinates. Every read restarts
//! raw DEFLATE from the nearest preceding access point: seek the compressed
//! file, prime the bit buffer if the restart is mid-byte, install the 32 KiB
//! window as dictionary, discard up to the requested offset, then decode
//! into the caller's buffer. No decoder state survives between calls, so the
//! handle is trivially seekable at the cost of at most one span of redundant
//! decoding per read.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::Error;
use crate::index::{AccessPoint, Index, WINSIZE};
use crate::indexer::CHUNK;
use crate::sidecar::{read_index, sidecar_path};
use crate::zstream::{Flush, Inflater, Status};

/// An open gzip file with random access through its sidecar index.
///
/// Created by [`GzSeekFile::open`]; the file descriptor and the index are
/// both released by drop. The handle is single-owner: every operation takes
/// `&mut self`, so shared concurrent use is ruled out at compile time.
#[derive(Debug)]
pub struct GzSeekFile {
    file: File,
    index: Index,
    offset: i64,
}

impl GzSeekFile {
    /// Open the gzip file at `path` together with its `<path>.idx` sidecar.
    ///
    /// The logical offset starts at zero. Fails with [`Error::Open`] when
    /// either file is missing, [`Error::Incompatible`] when the sidecar was
    /// built under conditions this reader cannot honor, and
    /// [`Error::Zlib`]/[`Error::Data`] when the sidecar is damaged.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let index = read_index(sidecar_path(&path))?;
        let file = File::open(path).map_err(|_| Error::Open)?;
        Ok(GzSeekFile {
            file,
            index,
            offset: 0,
        })
    }

    /// Set the logical uncompressed offset for the next read.
    ///
    /// The value is not validated against the stream length; reading at or
    /// past the end simply yields zero bytes.
    pub fn seek(&mut self, offset: i64) {
        self.offset = offset;
    }

    /// Current logical uncompressed offset.
    pub fn tell(&self) -> i64 {
        self.offset
    }

    /// The loaded index.
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Read uncompressed bytes at the current logical offset.
    ///
    /// Returns how many bytes were written into `buf`; the offset advances
    /// by exactly that amount. A short count means the end of the stream was
    /// reached during this call; zero means the offset is at or past the end
    /// (or, for negative offsets, that no access point precedes it). On
    /// error the offset is unchanged and the handle remains usable.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let point = match self.index.locate(self.offset) {
            Some(p) => p,
            None => return Ok(0),
        };
        let skip = (self.offset - point.out) as u64;
        let n = extract(&mut self.file, point, skip, buf)?;
        self.offset += n as i64;
        Ok(n)
    }
}

impl Read for GzSeekFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        GzSeekFile::read(self, buf).map_err(io::Error::from)
    }
}

/// Restart raw DEFLATE at `point`, discard `skip` bytes, then fill `buf`.
///
/// Returns the number of bytes written into `buf`: the full length unless
/// the stream ends first, and zero when it ends before `skip` is exhausted.
fn extract(
    file: &mut File,
    point: &AccessPoint,
    mut skip: u64,
    buf: &mut [u8],
) -> Result<usize, Error> {
    let mut strm = Inflater::raw()?;

    // Position on the first byte the decoder needs: one byte early when the
    // restart lies mid-byte, so the straddling byte can prime the decoder.
    let start = point.in_ - (point.bits != 0) as i64;
    file.seek(SeekFrom::Start(start as u64))
        .map_err(|_| Error::Read)?;
    if point.bits != 0 {
        let mut straddle = [0u8; 1];
        file.read_exact(&mut straddle).map_err(|_| Error::Read)?;
        strm.prime(point.bits, straddle[0] >> (8 - point.bits))?;
    }
    strm.set_dictionary(&point.window)?;

    let mut discard = [0u8; WINSIZE];
    let mut chunk = [0u8; CHUNK];
    let mut in_len = 0usize;
    let mut in_pos = 0usize;
    let mut filled = 0usize;
    let mut ended = false;

    while !ended && (skip > 0 || filled < buf.len()) {
        let out: &mut [u8] = if skip > 0 {
            let step = skip.min(WINSIZE as u64) as usize;
            &mut discard[..step]
        } else {
            &mut buf[filled..]
        };

        let mut out_pos = 0;
        while out_pos < out.len() {
            if in_pos == in_len {
                in_len = file.read(&mut chunk).map_err(|_| Error::Read)?;
                in_pos = 0;
                if in_len == 0 {
                    // The stream claims more data than the file holds.
                    return Err(Error::Data);
                }
            }
            let (status, consumed, produced) =
                strm.inflate(&chunk[in_pos..in_len], &mut out[out_pos..], Flush::None)?;
            in_pos += consumed;
            out_pos += produced;
            match status {
                Status::StreamEnd => {
                    ended = true;
                    break;
                }
                Status::BufError if consumed == 0 && produced == 0 => {
                    return Err(Error::Zlib);
                }
                Status::BufError | Status::Ok => {}
            }
        }

        if skip > 0 {
            skip -= out_pos as u64;
        } else {
            filled += out_pos;
        }
    }

    if skip > 0 {
        // End of stream reached while still skipping: the requested offset
        // lies beyond the uncompressed length.
        return Ok(0);
    }
    Ok(filled)
}
