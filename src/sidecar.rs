//! On-disk persistence of an index.
//!
//! The index travels in a sidecar file named by appending `.idx` to the
//! compressed file's path. The sidecar is itself gzip-compressed; inside the
//! gzip stream the layout is fixed and little-endian:
//!
//! ```text
//! "ZSEK"                        magic, 4 bytes
//! off_size: u32                 byte width of offsets, always 8
//! count:    u32                 number of access-point records
//! count × { out: i64, in: i64, bits: i32, window: [u8; 32768] }
//! ```
//!
//! `off_size` is kept from the C-era layout as a compatibility guard: a
//! reader refuses any width other than its own. This implementation always
//! writes 64-bit offsets, independent of host pointer width.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Error;
use crate::index::{AccessPoint, Index, WINSIZE};

/// Suffix appended to the compressed file's path to name its sidecar.
pub const SIDECAR_SUFFIX: &str = ".idx";

const MAGIC: [u8; 4] = *b"ZSEK";
const OFF_SIZE: u32 = 8;

/// Sidecar path for the compressed file at `path` (`foo.gz` → `foo.gz.idx`).
pub fn sidecar_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let mut name = path.as_ref().as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Serialize `index` to the sidecar file at `path`, replacing any previous
/// contents.
pub fn write_index<P: AsRef<Path>>(index: &Index, path: P) -> Result<(), Error> {
    let count = u32::try_from(index.len()).map_err(|_| Error::Data)?;
    let file = File::create(path).map_err(|_| Error::Open)?;
    let mut out = GzEncoder::new(BufWriter::new(file), Compression::default());

    out.write_all(&MAGIC).map_err(|_| Error::Write)?;
    out.write_all(&OFF_SIZE.to_le_bytes())
        .map_err(|_| Error::Write)?;
    out.write_all(&count.to_le_bytes()).map_err(|_| Error::Write)?;
    for point in index.points() {
        out.write_all(&point.out.to_le_bytes())
            .map_err(|_| Error::Write)?;
        out.write_all(&point.in_.to_le_bytes())
            .map_err(|_| Error::Write)?;
        out.write_all(&(point.bits as i32).to_le_bytes())
            .map_err(|_| Error::Write)?;
        out.write_all(&point.window).map_err(|_| Error::Write)?;
    }

    let mut inner = out.finish().map_err(|_| Error::Write)?;
    inner.flush().map_err(|_| Error::Write)?;
    Ok(())
}

/// Load an index from the sidecar file at `path`.
///
/// Magic or `off_size` mismatch is [`Error::Incompatible`]; any failure of
/// the gzip layer, including truncation and a bad trailing CRC, is
/// [`Error::Zlib`].
pub fn read_index<P: AsRef<Path>>(path: P) -> Result<Index, Error> {
    let file = File::open(path).map_err(|_| Error::Open)?;
    let mut inp = GzDecoder::new(BufReader::new(file));

    let mut magic = [0u8; 4];
    inp.read_exact(&mut magic).map_err(|_| Error::Zlib)?;
    if magic != MAGIC {
        return Err(Error::Incompatible);
    }
    if read_u32(&mut inp)? != OFF_SIZE {
        return Err(Error::Incompatible);
    }
    let count = read_u32(&mut inp)? as usize;

    // Capacity is clamped so a hostile count cannot force a giant
    // allocation; an undersized reserve just grows during the loop, and an
    // oversized count fails at the first short record read.
    let mut index = Index::with_capacity(count.min(4096));
    let mut prev_out: Option<i64> = None;
    for _ in 0..count {
        let out = read_i64(&mut inp)?;
        let in_ = read_i64(&mut inp)?;
        let bits = read_i32(&mut inp)?;
        if !(0..=7).contains(&bits) || prev_out.is_some_and(|p| out <= p) {
            return Err(Error::Data);
        }
        prev_out = Some(out);
        let mut window = [0u8; WINSIZE];
        inp.read_exact(&mut window).map_err(|_| Error::Zlib)?;
        index.push(AccessPoint {
            out,
            in_,
            bits: bits as u8,
            window,
        });
    }

    // Drain to end of stream so the gzip CRC is actually checked; records
    // followed by anything but a clean close mean the sidecar is damaged.
    let mut trailing = [0u8; 1];
    match inp.read(&mut trailing) {
        Ok(0) => Ok(index),
        _ => Err(Error::Zlib),
    }
}

fn read_u32<R: Read>(inp: &mut R) -> Result<u32, Error> {
    let mut buf = [0u8; 4];
    inp.read_exact(&mut buf).map_err(|_| Error::Zlib)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(inp: &mut R) -> Result<i32, Error> {
    let mut buf = [0u8; 4];
    inp.read_exact(&mut buf).map_err(|_| Error::Zlib)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_i64<R: Read>(inp: &mut R) -> Result<i64, Error> {
    let mut buf = [0u8; 8];
    inp.read_exact(&mut buf).map_err(|_| Error::Zlib)?;
    Ok(i64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_path_appends_suffix() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/data.gz")),
            PathBuf::from("/tmp/data.gz.idx")
        );
        assert_eq!(sidecar_path(Path::new("plain")), PathBuf::from("plain.idx"));
    }

    #[test]
    fn missing_sidecar_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_index(dir.path().join("absent.gz.idx")).unwrap_err();
        assert_eq!(err, Error::Open);
    }

    #[test]
    fn non_gzip_sidecar_is_a_zlib_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bogus.idx");
        std::fs::write(&path, b"ZSEK but not gzip-wrapped").unwrap();
        assert_eq!(read_index(&path).unwrap_err(), Error::Zlib);
    }
}
