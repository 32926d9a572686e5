//! Access points and the in-memory index over them.
//!
//! An access point captures everything needed to restart raw DEFLATE
//! decoding mid-stream: where the restart lands in both coordinate spaces,
//! the sub-byte bit alignment, and the 32 KiB of history the next block may
//! reference. The index is an ordered list of such points, appended during
//! the forward pass and binary-searched during extraction.

use std::fmt;

/// Size of the DEFLATE sliding window. gzip streams are always produced with
/// the full 32 KiB window, so every dictionary snapshot has this exact size.
pub const WINSIZE: usize = 32 * 1024;

/// Default distance, in uncompressed bytes, between consecutive access
/// points emitted by the indexer.
pub const SPAN: u64 = 1 << 20;

/// One resumable DEFLATE restart state.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessPoint {
    /// Uncompressed offset at which this point restarts output.
    pub out: i64,
    /// Compressed offset of the first whole byte fed to the decoder after
    /// the restart.
    pub in_: i64,
    /// Bits of the byte at `in_ - 1` that belong to the next block (0–7).
    /// Zero means the restart is byte-aligned.
    pub bits: u8,
    /// The 32 KiB of uncompressed output preceding `out`, installed as the
    /// decoder dictionary at restart. When less than 32 KiB of output exists
    /// the unused prefix is filler the stream can never reference.
    pub window: [u8; WINSIZE],
}

impl fmt::Debug for AccessPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPoint")
            .field("out", &self.out)
            .field("in_", &self.in_)
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

/// Ordered list of access points, strictly increasing in `out`.
///
/// Built once by [`crate::indexer::build_index`] and read-only afterwards.
/// The first point always sits at `out == 0`, immediately after the stream
/// header, so any non-negative target offset has a predecessor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Index {
    points: Vec<AccessPoint>,
}

impl Index {
    /// Empty index ready for appends.
    pub(crate) fn new() -> Self {
        Index { points: Vec::new() }
    }

    /// Pre-sized index, used by the sidecar reader which knows the record
    /// count up front.
    pub(crate) fn with_capacity(count: usize) -> Self {
        Index {
            points: Vec::with_capacity(count),
        }
    }

    /// Append a point. Caller maintains the ordering invariant; the debug
    /// assertion catches a violation early in test builds.
    pub(crate) fn push(&mut self, point: AccessPoint) {
        debug_assert!(
            self.points.last().map_or(true, |p| p.out < point.out),
            "access points must be appended in strictly increasing out order"
        );
        self.points.push(point);
    }

    /// Release extra capacity once the build pass is done.
    pub(crate) fn trim(&mut self) {
        self.points.shrink_to_fit();
    }

    /// Number of access points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the index holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points, in `out` order.
    pub fn points(&self) -> &[AccessPoint] {
        &self.points
    }

    /// The point with the largest `out <= target`, or `None` when no point
    /// precedes `target` (only possible for negative targets, given the
    /// `out == 0` anchor).
    pub fn locate(&self, target: i64) -> Option<&AccessPoint> {
        let idx = self.points.partition_point(|p| p.out <= target);
        idx.checked_sub(1).map(|i| &self.points[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(out: i64, in_: i64) -> AccessPoint {
        AccessPoint {
            out,
            in_,
            bits: 0,
            window: [0u8; WINSIZE],
        }
    }

    fn sample() -> Index {
        let mut index = Index::new();
        index.push(point(0, 10));
        index.push(point(1_500_000, 400_000));
        index.push(point(3_000_000, 800_000));
        index
    }

    #[test]
    fn locate_picks_greatest_preceding_point() {
        let index = sample();
        assert_eq!(index.locate(0).unwrap().out, 0);
        assert_eq!(index.locate(1_499_999).unwrap().out, 0);
        assert_eq!(index.locate(1_500_000).unwrap().out, 1_500_000);
        assert_eq!(index.locate(2_999_999).unwrap().out, 1_500_000);
        assert_eq!(index.locate(i64::MAX).unwrap().out, 3_000_000);
    }

    #[test]
    fn locate_rejects_negative_targets() {
        let index = sample();
        assert!(index.locate(-1).is_none());
    }

    #[test]
    fn locate_on_empty_index() {
        let index = Index::new();
        assert!(index.locate(0).is_none());
    }

    #[test]
    fn debug_output_elides_the_window() {
        let text = format!("{:?}", point(7, 3));
        assert!(text.contains("out: 7"));
        assert!(!text.contains("window"));
    }
}
