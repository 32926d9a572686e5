// zseek — random access to gzip streams through a sidecar index.

pub mod cli;
pub mod error;
pub mod index;
pub mod indexer;
pub mod reader;
pub mod sidecar;
mod zstream;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the common API entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Failure kinds shared by the build and read paths.
pub use error::Error;
/// One resumable DEFLATE restart state.
pub use index::AccessPoint;
/// Ordered, binary-searchable list of access points.
pub use index::Index;
/// Default uncompressed distance between access points (1 MiB).
pub use index::SPAN;
/// DEFLATE sliding-window size (32 KiB); also each point's dictionary size.
pub use index::WINSIZE;
/// Build an index for a gzip file on disk.
pub use indexer::build_index;
/// Build an index from any compressed byte source.
pub use indexer::build_index_from;
/// Random-access reader handle over an indexed gzip file.
pub use reader::GzSeekFile;
/// Load an index from a sidecar file.
pub use sidecar::read_index;
/// Derive the sidecar path for a compressed file (`foo.gz` → `foo.gz.idx`).
pub use sidecar::sidecar_path;
/// Persist an index to a sidecar file.
pub use sidecar::write_index;
/// The sidecar filename suffix (`.idx`).
pub use sidecar::SIDECAR_SUFFIX;
