//! The shared inner-object decode path (§4.3) and the batched, borrowing
//! reframer that walks a container's decompressed payload.

use std::borrow::Cow;

use crate::container::ContainerIterator;
use crate::error::{BlfError, BlfResult};
use crate::frames::{decode, DecodedFrame};
use crate::object_header::{BaseHeader, ExtendedHeader, BASE_HEADER_SIZE};
use crate::object_type::ObjectType;
use crate::ring_buffer::RingBuffer;
use crate::source::ContainerByteSource;

/// One decoded inner object: its header metadata, the raw bytes of its
/// body, and whatever typed frame this core could make of it. `frame` is
/// `None` for object types this core treats as opaque (LIN, FlexRay,
/// MOST, and so on) — `raw_payload` still gives downstream tooling
/// something to log or forward for those.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<'a> {
    pub object_type: ObjectType,
    pub time_ns: u64,
    pub raw_payload: Cow<'a, [u8]>,
    pub frame: Option<DecodedFrame<'a>>,
}

/// Parses one inner object out of `buf[0..]`. Returns the envelope and
/// the number of bytes to advance by (including any required padding),
/// per the alignment exception in §4.3/§9: `CAN_FD_MESSAGE_64` and
/// `ETHERNET_FRAME_EX` advance by exactly `obj_size`; every other inner
/// object type advances by `obj_size + (obj_size % 4)`.
pub fn parse_object(buf: &[u8], offset: u64) -> BlfResult<(Envelope<'_>, usize)> {
    let base = BaseHeader::parse(buf, offset)?;
    let obj_size = base.object_size as usize;
    if obj_size < BASE_HEADER_SIZE {
        return Err(BlfError::MalformedObject {
            offset,
            what: "inner object",
            reason: "obj_size smaller than base header",
        });
    }
    if buf.len() < obj_size {
        return Err(BlfError::Truncated {
            offset,
            what: "inner object",
            needed: obj_size,
            got: buf.len(),
        });
    }

    let ext_offset = offset + BASE_HEADER_SIZE as u64;
    let ext_buf = &buf[BASE_HEADER_SIZE..];
    let ext = ExtendedHeader::parse(ext_buf, base.header_version, ext_offset)?;

    // The body starts after the base header and the extended header, not
    // at the wire `header_size` field (which some BLF tooling leaves as
    // just the base header's own size regardless of extended header
    // version).
    let body_start = BASE_HEADER_SIZE + ext.size;
    if body_start > obj_size {
        return Err(BlfError::MalformedObject {
            offset,
            what: "inner object",
            reason: "base + extended header exceeds obj_size",
        });
    }
    let body = &buf[body_start..obj_size];
    let body_offset = offset + body_start as u64;

    let frame = decode(base.object_type, body, body_offset)?;

    let advance = if base.object_type.advances_without_padding() {
        obj_size
    } else {
        obj_size + (obj_size % 4)
    };

    Ok((
        Envelope {
            object_type: base.object_type,
            time_ns: ext.time_ns(),
            raw_payload: Cow::Borrowed(body),
            frame,
        },
        advance,
    ))
}

/// Invoked once per inner object as the batched reframer walks a
/// container's decompressed payload.
pub trait FrameSink {
    fn on_envelope(&mut self, envelope: Envelope<'_>) -> BlfResult<()>;
}

impl<F: FnMut(Envelope<'_>) -> BlfResult<()>> FrameSink for F {
    fn on_envelope(&mut self, envelope: Envelope<'_>) -> BlfResult<()> {
        self(envelope)
    }
}

/// Walks every container a [`ContainerIterator`] yields, carrying any
/// trailing partial-object bytes forward into the next container so an
/// inner object is never split across a container boundary. Grounded in
/// the tail-carryover buffering used by streaming BLF readers that
/// process containers one at a time.
pub struct Reframer<S> {
    containers: ContainerIterator<S>,
    tail: Vec<u8>,
    tail_offset: u64,
}

impl<S: ContainerByteSource> Reframer<S> {
    pub fn new(containers: ContainerIterator<S>) -> Self {
        Self {
            containers,
            tail: Vec::new(),
            tail_offset: 0,
        }
    }

    /// Feeds every envelope from the remaining containers to `sink`,
    /// stopping cleanly at end of stream or propagating the first error.
    pub fn run(mut self, sink: &mut dyn FrameSink) -> BlfResult<()> {
        while let Some(result) = self.containers.next() {
            let payload = result?;
            self.feed(&payload, sink)?;
        }
        if !self.tail.is_empty() {
            return Err(BlfError::Truncated {
                offset: self.tail_offset,
                what: "inner object",
                needed: BASE_HEADER_SIZE,
                got: self.tail.len(),
            });
        }
        Ok(())
    }

    fn feed(&mut self, payload: &[u8], sink: &mut dyn FrameSink) -> BlfResult<()> {
        let mut buf: Vec<u8> = if self.tail.is_empty() {
            payload.to_vec()
        } else {
            let mut combined = std::mem::take(&mut self.tail);
            combined.extend_from_slice(payload);
            combined
        };
        let mut base_offset = self.tail_offset;
        let mut pos = 0usize;

        loop {
            if buf.len() - pos < BASE_HEADER_SIZE {
                break;
            }
            let peek_offset = base_offset + pos as u64;
            // `buf.len() - pos >= BASE_HEADER_SIZE` was just checked above, so
            // this can only fail on a genuine bad-magic condition, never on
            // truncation; any error here is fatal.
            let base = BaseHeader::parse(&buf[pos..], peek_offset)?;
            let obj_size = base.object_size as usize;
            if buf.len() - pos < obj_size {
                break;
            }

            let (envelope, advance) = parse_object(&buf[pos..], peek_offset)?;
            sink.on_envelope(envelope)?;
            pos += advance;
        }

        base_offset += pos as u64;
        self.tail = buf[pos..].to_vec();
        self.tail_offset = base_offset;
        Ok(())
    }
}

/// The ring-buffer path's reframer: reads exactly one inner object's
/// header and then its remaining bytes off `ring`'s reader handle (§4.5),
/// combines them into one owned buffer per object, and runs
/// [`parse_object`] over it. Unlike [`Reframer`], the resulting envelopes
/// own their payload rather than borrowing from a shared container
/// buffer, since the ring buffer's storage is reused as soon as the
/// reader's copy is taken. Runs until the ring is closed and drained.
pub fn drain_ring(ring: &RingBuffer, sink: &mut dyn FrameSink) -> BlfResult<()> {
    let mut offset = 0u64;
    loop {
        let header = match ring.read(BASE_HEADER_SIZE) {
            None => return Ok(()),
            Some(b) => b,
        };
        if header.len() < BASE_HEADER_SIZE {
            return Err(BlfError::Truncated {
                offset,
                what: "inner object header",
                needed: BASE_HEADER_SIZE,
                got: header.len(),
            });
        }

        let base = BaseHeader::parse(&header, offset)?;
        let obj_size = base.object_size as usize;
        if obj_size < BASE_HEADER_SIZE {
            return Err(BlfError::MalformedObject {
                offset,
                what: "inner object",
                reason: "obj_size smaller than base header",
            });
        }

        let mut buf = header;
        let remaining = obj_size - BASE_HEADER_SIZE;
        if remaining > 0 {
            let body_offset = offset + BASE_HEADER_SIZE as u64;
            let rest = ring.read(remaining).ok_or(BlfError::Truncated {
                offset: body_offset,
                what: "inner object body",
                needed: remaining,
                got: 0,
            })?;
            if rest.len() < remaining {
                return Err(BlfError::Truncated {
                    offset: body_offset,
                    what: "inner object body",
                    needed: remaining,
                    got: rest.len(),
                });
            }
            buf.extend_from_slice(&rest);
        }

        let (envelope, advance) = parse_object(&buf, offset)?;
        let padding = advance - obj_size;
        sink.on_envelope(envelope)?;

        if padding > 0 {
            let pad_offset = offset + obj_size as u64;
            let pad = ring.read(padding).ok_or(BlfError::Truncated {
                offset: pad_offset,
                what: "inner object padding",
                needed: padding,
                got: 0,
            })?;
            if pad.len() < padding {
                return Err(BlfError::Truncated {
                    offset: pad_offset,
                    what: "inner object padding",
                    needed: padding,
                    got: pad.len(),
                });
            }
        }

        offset += advance as u64;
    }
}
