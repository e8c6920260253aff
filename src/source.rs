//! Byte sources the container iterator can run against: a sequential
//! stream, or a memory-mapped random-access view over the whole file.

use std::fs::File;
use std::io::Read;

use memmap2::Mmap;

use crate::error::{BlfError, BlfResult};

/// Result of attempting to read `n` bytes at the current position.
pub enum ReadOutcome {
    /// Zero bytes were available; a clean place to stop.
    Eof,
    /// Exactly the requested number of bytes.
    Data(Vec<u8>),
}

/// What the container iterator (§4.2) needs from whatever holds the file
/// bytes: read-and-advance, and know where you are for diagnostics.
pub trait ContainerByteSource {
    fn position(&self) -> u64;

    /// Reads exactly `n` bytes starting at the current position and
    /// advances past them. A read of zero bytes at the start (clean EOF)
    /// yields `ReadOutcome::Eof`; a read that finds *some* but fewer than
    /// `n` bytes remaining is a fatal truncation, per §4.2's "short reads
    /// ... are fatal" rule.
    fn read_exact_or_eof(&mut self, n: usize) -> BlfResult<ReadOutcome>;
}

/// Wraps any `Read` implementation, advancing strictly forward. Used by
/// the pipeline driver's producers (each owning a private file handle)
/// and by the single-threaded non-streaming path.
pub struct SequentialSource<R> {
    reader: R,
    position: u64,
}

impl<R: Read> SequentialSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, position: 0 }
    }
}

impl<R: Read> ContainerByteSource for SequentialSource<R> {
    fn position(&self) -> u64 {
        self.position
    }

    fn read_exact_or_eof(&mut self, n: usize) -> BlfResult<ReadOutcome> {
        let mut buf = vec![0u8; n];
        let mut got = 0usize;
        while got < n {
            match self.reader.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(read) => got += read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(BlfError::Io {
                        offset: self.position + got as u64,
                        source: e,
                    })
                }
            }
        }
        if got == 0 {
            return Ok(ReadOutcome::Eof);
        }
        if got < n {
            return Err(BlfError::Truncated {
                offset: self.position,
                what: "container stream",
                needed: n,
                got,
            });
        }
        self.position += n as u64;
        Ok(ReadOutcome::Data(buf))
    }
}

/// A memory-mapped, random-access view of the whole file. The container
/// iterator addresses it identically to a sequential stream; the only
/// difference is that "reading" is slicing rather than a syscall.
pub struct MappedSource {
    map: Mmap,
    position: u64,
}

impl MappedSource {
    pub fn open(file: &File) -> BlfResult<Self> {
        // Safety: the caller guarantees the backing file is not truncated
        // or otherwise mutated out from under the mapping while it is in
        // use; this matches the contract every mmap-based reader in this
        // ecosystem relies on.
        let map = unsafe { Mmap::map(file) }.map_err(|e| BlfError::Io { offset: 0, source: e })?;
        Ok(Self { map, position: 0 })
    }
}

impl ContainerByteSource for MappedSource {
    fn position(&self) -> u64 {
        self.position
    }

    fn read_exact_or_eof(&mut self, n: usize) -> BlfResult<ReadOutcome> {
        let start = self.position as usize;
        let remaining = self.map.len().saturating_sub(start);
        if remaining == 0 {
            return Ok(ReadOutcome::Eof);
        }
        if remaining < n {
            return Err(BlfError::Truncated {
                offset: self.position,
                what: "mapped container view",
                needed: n,
                got: remaining,
            });
        }
        let data = self.map[start..start + n].to_vec();
        self.position += n as u64;
        Ok(ReadOutcome::Data(data))
    }
}
