//! The container iterator (§4.2): turns a byte source into a lazy
//! sequence of decompressed container payloads.

use flate2::read::ZlibDecoder;
use std::io::Read;

use crate::error::{BlfError, BlfResult};
use crate::object_header::{BaseHeader, BASE_HEADER_SIZE};
use crate::object_type::ObjectType;
use crate::source::{ContainerByteSource, ReadOutcome};

/// Compression method code meaning "payload used verbatim."
pub const NO_COMPRESSION: u16 = 0;
/// Compression method code meaning "payload is raw DEFLATE, window bits 15."
pub const ZLIB_DEFLATE: u16 = 2;

/// `compression_method(u32) + uncompressed_size_hint(u32)`.
const CONTAINER_SUBHEADER_SIZE: usize = 8;

/// Produces decompressed container payload buffers, one per log
/// container, from any [`ContainerByteSource`].
pub struct ContainerIterator<S> {
    source: S,
    done: bool,
}

impl<S: ContainerByteSource> ContainerIterator<S> {
    pub fn new(source: S) -> Self {
        Self { source, done: false }
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Runs one iteration of §4.2's steps 1-6. Returns `Ok(None)` only on
    /// the clean end-of-file condition (zero bytes at a container
    /// boundary); every other failure is fatal and propagated.
    pub fn next_container(&mut self) -> BlfResult<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }
        let offset = self.source.position();
        let header_bytes = match self.source.read_exact_or_eof(BASE_HEADER_SIZE)? {
            ReadOutcome::Eof => {
                self.done = true;
                return Ok(None);
            }
            ReadOutcome::Data(d) => d,
        };
        let header = BaseHeader::parse(&header_bytes, offset)?;
        if header.object_type != ObjectType::LogContainer {
            return Err(BlfError::MalformedObject {
                offset,
                what: "outer object",
                reason: "obj_type is not LOG_CONTAINER",
            });
        }

        let min_size = header.header_size as u32 + CONTAINER_SUBHEADER_SIZE as u32;
        if header.object_size < min_size {
            return Err(BlfError::OutOfRangeContainer {
                offset,
                obj_size: header.object_size,
                min_size,
            });
        }

        let subheader_offset = self.source.position();
        let subheader_bytes = match self.source.read_exact_or_eof(CONTAINER_SUBHEADER_SIZE)? {
            ReadOutcome::Eof => {
                return Err(BlfError::Truncated {
                    offset: subheader_offset,
                    what: "log container sub-header",
                    needed: CONTAINER_SUBHEADER_SIZE,
                    got: 0,
                })
            }
            ReadOutcome::Data(d) => d,
        };
        let compression_method = u16::from_le_bytes([subheader_bytes[0], subheader_bytes[1]]);
        let uncompressed_hint = u32::from_le_bytes([
            subheader_bytes[4],
            subheader_bytes[5],
            subheader_bytes[6],
            subheader_bytes[7],
        ]) as usize;

        let payload_size = (header.object_size as usize)
            .saturating_sub(header.header_size as usize)
            .saturating_sub(CONTAINER_SUBHEADER_SIZE);
        let payload_offset = self.source.position();
        let compressed = match self.source.read_exact_or_eof(payload_size)? {
            ReadOutcome::Eof => {
                if payload_size == 0 {
                    Vec::new()
                } else {
                    return Err(BlfError::Truncated {
                        offset: payload_offset,
                        what: "log container payload",
                        needed: payload_size,
                        got: 0,
                    });
                }
            }
            ReadOutcome::Data(d) => d,
        };

        let decompressed = decompress(compression_method, &compressed, uncompressed_hint, payload_offset)?;

        let padding = (header.object_size as usize) % 4;
        if padding != 0 {
            match self.source.read_exact_or_eof(padding)? {
                ReadOutcome::Eof => {
                    return Err(BlfError::Truncated {
                        offset: self.source.position(),
                        what: "container padding",
                        needed: padding,
                        got: 0,
                    })
                }
                ReadOutcome::Data(_) => {}
            }
        }

        Ok(Some(decompressed))
    }
}

/// Shared by the single-threaded container iterator and the pipeline
/// driver's producers.
pub fn decompress(compression_method: u16, compressed: &[u8], hint: usize, offset: u64) -> BlfResult<Vec<u8>> {
    match compression_method {
        NO_COMPRESSION => Ok(compressed.to_vec()),
        ZLIB_DEFLATE => {
            let mut decoder = ZlibDecoder::new(compressed);
            let mut out = Vec::with_capacity(hint);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| BlfError::Decompression { offset, source: e })?;
            Ok(out)
        }
        other => Err(BlfError::UnsupportedCompression {
            offset,
            method: other,
        }),
    }
}

impl<S: ContainerByteSource> Iterator for ContainerIterator<S> {
    type Item = BlfResult<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_container() {
            Ok(Some(buf)) => Some(Ok(buf)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
