//! The base object header shared by every container and inner object, plus
//! the two inner-object extended header layouts.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{BlfError, BlfResult};
use crate::object_type::ObjectType;

/// Magic bytes `LOBJ`, read little-endian as a u32.
pub const OBJECT_SIGNATURE: u32 = 0x4A424F4C;

/// Size in bytes of the base object header on the wire.
pub const BASE_HEADER_SIZE: usize = 16;

/// Flag bit indicating a timestamp is expressed in units of 10 microseconds
/// rather than nanoseconds.
pub const TIME_TEN_MICS: u32 = 0x1;

/// The header every object (container or inner) begins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseHeader {
    pub header_size: u16,
    pub header_version: u16,
    pub object_size: u32,
    pub object_type: ObjectType,
}

impl BaseHeader {
    /// Parses a base header from exactly [`BASE_HEADER_SIZE`] bytes.
    /// `offset` is the absolute file/stream offset of `buf[0]`, used only
    /// for diagnostics.
    pub fn parse(buf: &[u8], offset: u64) -> BlfResult<Self> {
        if buf.len() < BASE_HEADER_SIZE {
            return Err(BlfError::Truncated {
                offset,
                what: "base object header",
                needed: BASE_HEADER_SIZE,
                got: buf.len(),
            });
        }
        let mut cursor = Cursor::new(buf);
        let signature = read_u32(&mut cursor, offset)?;
        if signature != OBJECT_SIGNATURE {
            return Err(BlfError::InvalidObjectMagic { offset });
        }
        let header_size = read_u16(&mut cursor, offset)?;
        let header_version = read_u16(&mut cursor, offset)?;
        let object_size = read_u32(&mut cursor, offset)?;
        let object_type = ObjectType::from(read_u32(&mut cursor, offset)?);
        Ok(BaseHeader {
            header_size,
            header_version,
            object_size,
            object_type,
        })
    }
}

/// The per-version extended header that follows the base header on every
/// inner object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedHeader {
    pub flags: u32,
    pub timestamp: u64,
    pub size: usize,
}

impl ExtendedHeader {
    /// v1 layout: flags(u32) + client_index(u16) + object_version(u16) + timestamp(u64) = 16 bytes.
    const V1_SIZE: usize = 16;
    /// v2 layout: flags(u32) + time_stamp_status(u8) + reserved(u8) + object_version(u16)
    /// + timestamp(u64) + original_timestamp(u64) = 24 bytes.
    const V2_SIZE: usize = 24;

    /// Parses the extended header immediately following a base header,
    /// dispatching on `header_version` per §3.
    pub fn parse(buf: &[u8], header_version: u16, offset: u64) -> BlfResult<Self> {
        match header_version {
            1 => {
                if buf.len() < Self::V1_SIZE {
                    return Err(BlfError::Truncated {
                        offset,
                        what: "v1 extended header",
                        needed: Self::V1_SIZE,
                        got: buf.len(),
                    });
                }
                let mut cursor = Cursor::new(buf);
                let flags = read_u32(&mut cursor, offset)?;
                let _client_index = read_u16(&mut cursor, offset)?;
                let _object_version = read_u16(&mut cursor, offset)?;
                let timestamp = read_u64(&mut cursor, offset)?;
                Ok(ExtendedHeader {
                    flags,
                    timestamp,
                    size: Self::V1_SIZE,
                })
            }
            2 => {
                if buf.len() < Self::V2_SIZE {
                    return Err(BlfError::Truncated {
                        offset,
                        what: "v2 extended header",
                        needed: Self::V2_SIZE,
                        got: buf.len(),
                    });
                }
                let mut cursor = Cursor::new(buf);
                let flags = read_u32(&mut cursor, offset)?;
                let _time_stamp_status = cursor
                    .read_u8()
                    .map_err(|e| BlfError::Io { offset, source: e })?;
                let _reserved = cursor
                    .read_u8()
                    .map_err(|e| BlfError::Io { offset, source: e })?;
                let _object_version = read_u16(&mut cursor, offset)?;
                let timestamp = read_u64(&mut cursor, offset)?;
                let _original_timestamp = read_u64(&mut cursor, offset)?;
                Ok(ExtendedHeader {
                    flags,
                    timestamp,
                    size: Self::V2_SIZE,
                })
            }
            other => Err(BlfError::UnknownHeaderVersion {
                offset,
                version: other,
            }),
        }
    }

    /// Scales the raw on-disk timestamp to nanoseconds per the
    /// `TIME_TEN_MICS` rule.
    pub fn time_ns(&self) -> u64 {
        if self.flags == TIME_TEN_MICS {
            self.timestamp * 10_000
        } else {
            self.timestamp
        }
    }
}

fn read_u16(cursor: &mut Cursor<&[u8]>, offset: u64) -> BlfResult<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })
}

fn read_u32(cursor: &mut Cursor<&[u8]>, offset: u64) -> BlfResult<u32> {
    cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })
}

fn read_u64(cursor: &mut Cursor<&[u8]>, offset: u64) -> BlfResult<u64> {
    cursor
        .read_u64::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })
}
