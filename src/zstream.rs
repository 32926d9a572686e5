//! Thin RAII wrapper around the zlib inflate machinery.
//!
//! The restart engine needs three zlib capabilities that high-level wrappers
//! do not surface: stopping at DEFLATE block boundaries (`Z_BLOCK`) with the
//! `data_type` word exposed, priming the bit buffer with 0–7 leading bits
//! (`inflatePrime`), and installing a 32 KiB dictionary on a raw stream
//! (`inflateSetDictionary`). [`Inflater`] exposes exactly those, with
//! slice-based I/O and no raw pointers past this module boundary.

use std::alloc::{self, Layout};
use std::mem;
use std::ptr;

use libc::c_int;
use libz_sys::{
    inflate, inflateEnd, inflateInit2_, inflatePrime, inflateSetDictionary, uInt, voidpf,
    z_stream, zlibVersion, Z_BLOCK, Z_BUF_ERROR, Z_DATA_ERROR, Z_MEM_ERROR, Z_NEED_DICT,
    Z_NO_FLUSH, Z_OK, Z_STREAM_END,
};

use crate::error::Error;

/// `windowBits` for gzip-or-zlib header auto-detection (15 + 32).
const WINDOW_BITS_AUTO: c_int = 47;
/// `windowBits` for headerless (raw) DEFLATE.
const WINDOW_BITS_RAW: c_int = -15;

// data_type bits after an inflate() return, per zlib.h.
const DT_END_OF_BLOCK: c_int = 128;
const DT_LAST_BLOCK: c_int = 64;
const DT_UNUSED_BITS: c_int = 7;

/// How far one [`Inflater::inflate`] call is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flush {
    /// Inflate until input or output is exhausted.
    None,
    /// Additionally stop at each DEFLATE block boundary.
    Block,
}

/// Outcome of one [`Inflater::inflate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    /// Progress was made; more stream remains.
    Ok,
    /// The end of the DEFLATE stream was reached.
    StreamEnd,
    /// No progress was possible (more input or output space needed).
    BufError,
}

/// An owned zlib inflate state.
///
/// The `z_stream` is boxed so its address is stable across calls, which zlib
/// requires. `next_in`/`next_out` are set immediately before each `inflate`
/// call and never outlive it, so the struct holds no dangling pointers
/// between calls.
pub(crate) struct Inflater {
    strm: Box<z_stream>,
}

impl Inflater {
    /// Decoder that auto-detects a gzip or zlib header. Used by the indexer's
    /// forward pass.
    pub fn gzip_or_zlib() -> Result<Self, Error> {
        Self::init(WINDOW_BITS_AUTO)
    }

    /// Headerless DEFLATE decoder. Used for every mid-stream restart.
    pub fn raw() -> Result<Self, Error> {
        Self::init(WINDOW_BITS_RAW)
    }

    fn init(window_bits: c_int) -> Result<Self, Error> {
        let mut strm = Box::new(z_stream {
            next_in: ptr::null_mut(),
            avail_in: 0,
            total_in: 0,
            next_out: ptr::null_mut(),
            avail_out: 0,
            total_out: 0,
            msg: ptr::null_mut(),
            state: ptr::null_mut(),
            zalloc: rust_zalloc,
            zfree: rust_zfree,
            opaque: ptr::null_mut(),
            data_type: 0,
            adler: 0,
            reserved: 0,
        });
        let ret = unsafe {
            inflateInit2_(
                strm.as_mut(),
                window_bits,
                zlibVersion(),
                mem::size_of::<z_stream>() as c_int,
            )
        };
        translate(ret)?;
        Ok(Inflater { strm })
    }

    /// Decompress from `input` into `output`.
    ///
    /// Returns the status plus how many input bytes were consumed and output
    /// bytes produced. With [`Flush::Block`] the call also returns at each
    /// block boundary so the caller can inspect [`Inflater::at_end_of_block`]
    /// and friends.
    pub fn inflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: Flush,
    ) -> Result<(Status, usize, usize), Error> {
        let avail_in = input.len().min(uInt::MAX as usize) as uInt;
        let avail_out = output.len().min(uInt::MAX as usize) as uInt;

        // zlib never writes through next_in; the cast is for the C signature.
        self.strm.next_in = input.as_ptr() as *mut u8;
        self.strm.avail_in = avail_in;
        self.strm.next_out = output.as_mut_ptr();
        self.strm.avail_out = avail_out;

        let mode = match flush {
            Flush::None => Z_NO_FLUSH,
            Flush::Block => Z_BLOCK,
        };
        let ret = unsafe { inflate(self.strm.as_mut(), mode) };

        let consumed = (avail_in - self.strm.avail_in) as usize;
        let produced = (avail_out - self.strm.avail_out) as usize;
        self.strm.next_in = ptr::null_mut();
        self.strm.next_out = ptr::null_mut();

        let status = translate(ret)?;
        Ok((status, consumed, produced))
    }

    /// Feed `bits` leading bits (taken from the low end of `value`) into the
    /// decoder's bit buffer before any byte input is consumed.
    pub fn prime(&mut self, bits: u8, value: u8) -> Result<(), Error> {
        let ret = unsafe { inflatePrime(self.strm.as_mut(), bits as c_int, value as c_int) };
        translate(ret).map(|_| ())
    }

    /// Install `dict` as the sliding-window history, as if the decoder had
    /// just produced it.
    pub fn set_dictionary(&mut self, dict: &[u8]) -> Result<(), Error> {
        let ret = unsafe {
            inflateSetDictionary(self.strm.as_mut(), dict.as_ptr(), dict.len() as uInt)
        };
        translate(ret).map(|_| ())
    }

    /// True when the last return left the decoder exactly at the end of a
    /// DEFLATE block (or at the end of the stream header).
    pub fn at_end_of_block(&self) -> bool {
        self.strm.data_type & DT_END_OF_BLOCK != 0
    }

    /// True when the block just finished (or in progress) is the stream's
    /// final block.
    pub fn at_last_block(&self) -> bool {
        self.strm.data_type & DT_LAST_BLOCK != 0
    }

    /// Number of unconsumed bits (0–7) in the last input byte the decoder
    /// looked at. These belong to the next block.
    pub fn unused_bits(&self) -> u8 {
        (self.strm.data_type & DT_UNUSED_BITS) as u8
    }
}

impl Drop for Inflater {
    fn drop(&mut self) {
        unsafe {
            inflateEnd(self.strm.as_mut());
        }
    }
}

/// Collapse a zlib return code into [`Status`] or [`Error`].
///
/// `Z_NEED_DICT` is promoted to a data error: a correct restart installs the
/// dictionary before inflating, so the signal can only mean the stream is
/// not what the index said it was.
fn translate(ret: c_int) -> Result<Status, Error> {
    match ret {
        Z_OK => Ok(Status::Ok),
        Z_STREAM_END => Ok(Status::StreamEnd),
        Z_BUF_ERROR => Ok(Status::BufError),
        Z_NEED_DICT | Z_DATA_ERROR => Err(Error::Data),
        Z_MEM_ERROR => Err(Error::OutOfMemory),
        _ => Err(Error::Zlib),
    }
}

// ---------------------------------------------------------------------------
// zlib allocation callbacks
// ---------------------------------------------------------------------------
//
// libz-sys requires non-null zalloc/zfree. These route zlib's allocations
// through the Rust global allocator. zfree receives no size, so each
// allocation is prefixed with a usize header recording the full size.

const HEADER: usize = mem::size_of::<usize>();
const ALIGN: usize = mem::align_of::<usize>();

extern "C" fn rust_zalloc(_opaque: voidpf, items: uInt, item_size: uInt) -> voidpf {
    let wanted = (items as usize).checked_mul(item_size as usize);
    let total = match wanted.and_then(|n| n.checked_add(HEADER)) {
        Some(n) => n,
        None => return ptr::null_mut(),
    };
    let layout = match Layout::from_size_align(total, ALIGN) {
        Ok(l) => l,
        Err(_) => return ptr::null_mut(),
    };
    unsafe {
        let base = alloc::alloc(layout) as *mut usize;
        if base.is_null() {
            return ptr::null_mut();
        }
        base.write(total);
        base.add(1) as voidpf
    }
}

extern "C" fn rust_zfree(_opaque: voidpf, address: voidpf) {
    if address.is_null() {
        return;
    }
    unsafe {
        let base = (address as *mut usize).sub(1);
        let total = base.read();
        let layout = Layout::from_size_align_unchecked(total, ALIGN);
        alloc::dealloc(base as *mut u8, layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn inflates_a_whole_zlib_stream() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(100);
        let compressed = zlib_compress(&payload);

        let mut inf = Inflater::gzip_or_zlib().unwrap();
        let mut out = vec![0u8; payload.len() + 64];
        let mut in_pos = 0;
        let mut out_pos = 0;
        loop {
            let (status, consumed, produced) = inf
                .inflate(&compressed[in_pos..], &mut out[out_pos..], Flush::None)
                .unwrap();
            in_pos += consumed;
            out_pos += produced;
            if status == Status::StreamEnd {
                break;
            }
        }
        assert_eq!(&out[..out_pos], &payload[..]);
    }

    #[test]
    fn block_mode_reports_boundaries() {
        let payload = b"abcdefgh".repeat(8192);
        let compressed = zlib_compress(&payload);

        let mut inf = Inflater::gzip_or_zlib().unwrap();
        let mut out = vec![0u8; payload.len() + 64];
        let mut in_pos = 0;
        let mut out_pos = 0;
        let mut saw_boundary = false;
        loop {
            let (status, consumed, produced) = inf
                .inflate(&compressed[in_pos..], &mut out[out_pos..], Flush::Block)
                .unwrap();
            in_pos += consumed;
            out_pos += produced;
            if status == Status::StreamEnd {
                break;
            }
            if inf.at_end_of_block() {
                saw_boundary = true;
                assert!(inf.unused_bits() <= 7);
            }
        }
        assert!(saw_boundary, "Z_BLOCK never stopped at a block boundary");
    }

    #[test]
    fn truncated_stream_is_a_buf_error_not_a_crash() {
        let payload = b"some compressible payload ".repeat(512);
        let compressed = zlib_compress(&payload);
        let cut = &compressed[..compressed.len() / 2];

        let mut inf = Inflater::gzip_or_zlib().unwrap();
        let mut out = vec![0u8; payload.len()];
        let mut in_pos = 0;
        let mut out_pos = 0;
        loop {
            let (status, consumed, produced) = inf
                .inflate(&cut[in_pos..], &mut out[out_pos..], Flush::None)
                .unwrap();
            in_pos += consumed;
            out_pos += produced;
            if status != Status::Ok || in_pos == cut.len() {
                // Out of input with no stream end: exactly the truncation case.
                assert_ne!(status, Status::StreamEnd);
                break;
            }
        }
    }

    #[test]
    fn garbage_input_is_a_data_error() {
        let mut inf = Inflater::gzip_or_zlib().unwrap();
        let garbage = [0xff_u8; 64];
        let mut out = [0u8; 256];
        let err = inf
            .inflate(&garbage, &mut out, Flush::None)
            .expect_err("garbage must not inflate");
        assert_eq!(err, Error::Data);
    }
}
