//! Error types for BLF parsing, decompression, and the ring-buffer pipeline.

use std::io;
use thiserror::Error;

/// A single fatal condition observed while decoding a BLF file or stream.
///
/// Every variant carries the byte offset at which the condition was
/// detected, so callers can render "invalid file at offset X, reason R"
/// without additional bookkeeping.
#[derive(Debug, Error)]
pub enum BlfError {
    #[error("I/O error at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("invalid file magic at offset {offset} (expected \"LOGG\")")]
    InvalidFileMagic { offset: u64 },

    #[error("invalid object magic at offset {offset} (expected \"LOBJ\")")]
    InvalidObjectMagic { offset: u64 },

    #[error("truncated {what} at offset {offset}: needed {needed} bytes, got {got}")]
    Truncated {
        offset: u64,
        what: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("unsupported compression method {method} at offset {offset}")]
    UnsupportedCompression { offset: u64, method: u16 },

    #[error("unknown object header version {version} at offset {offset}")]
    UnknownHeaderVersion { offset: u64, version: u16 },

    #[error("container at offset {offset} declares obj_size {obj_size} smaller than its fixed headers ({min_size})")]
    OutOfRangeContainer {
        offset: u64,
        obj_size: u32,
        min_size: u32,
    },

    #[error("payload of {len} bytes at offset {offset} exceeds ring buffer capacity {capacity}")]
    PayloadExceedsCapacity {
        offset: u64,
        len: usize,
        capacity: usize,
    },

    #[error("malformed {what} at offset {offset}: {reason}")]
    MalformedObject {
        offset: u64,
        what: &'static str,
        reason: &'static str,
    },

    #[error("decompression failure at offset {offset}: {source}")]
    Decompression {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl BlfError {
    /// The byte offset at which the error was detected, for diagnostics.
    pub fn offset(&self) -> u64 {
        match self {
            BlfError::Io { offset, .. }
            | BlfError::InvalidFileMagic { offset }
            | BlfError::InvalidObjectMagic { offset }
            | BlfError::Truncated { offset, .. }
            | BlfError::UnsupportedCompression { offset, .. }
            | BlfError::UnknownHeaderVersion { offset, .. }
            | BlfError::OutOfRangeContainer { offset, .. }
            | BlfError::PayloadExceedsCapacity { offset, .. }
            | BlfError::MalformedObject { offset, .. }
            | BlfError::Decompression { offset, .. } => *offset,
        }
    }
}

/// A specialized `Result` type for BLF decoding operations.
pub type BlfResult<T> = Result<T, BlfError>;
