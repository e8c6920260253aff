//! The file-level header that opens every BLF file.
//!
//! Despite the name `FileStatistics` used by some BLF tooling (this one
//! included, historically), the struct is the file's fixed header: magic,
//! administrative metadata, object count, and the two calendar timestamps
//! bracketing the recording.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{BlfError, BlfResult};

/// Magic bytes `LOGG`, read little-endian as a u32.
pub const FILE_SIGNATURE: u32 = 0x47474F4C;

/// Fixed portion of the file header understood by this decoder; any bytes
/// beyond `header_size` are reserved and skipped without interpretation.
const FILE_HEADER_FIXED_SIZE: u32 = 144;

/// A Windows `SYSTEMTIME`-shaped calendar timestamp as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

impl CalendarTime {
    fn read(cursor: &mut Cursor<&[u8]>) -> BlfResult<Self> {
        let offset = cursor.position();
        let read_u16 = |c: &mut Cursor<&[u8]>| -> BlfResult<u16> {
            c.read_u16::<LittleEndian>()
                .map_err(|e| BlfError::Io { offset, source: e })
        };
        Ok(Self {
            year: read_u16(cursor)?,
            month: read_u16(cursor)?,
            day_of_week: read_u16(cursor)?,
            day: read_u16(cursor)?,
            hour: read_u16(cursor)?,
            minute: read_u16(cursor)?,
            second: read_u16(cursor)?,
            milliseconds: read_u16(cursor)?,
        })
    }

    /// Converts the calendar tuple to nanoseconds since the Unix epoch.
    ///
    /// `day_of_week` is ignored, matching the reference decoder. An
    /// out-of-range tuple (impossible month/day, etc.) yields `0` rather
    /// than failing the parse — this timestamp is advisory metadata, not
    /// part of the framing contract.
    pub fn to_epoch_nanos(&self) -> i64 {
        days_from_civil(self.year as i64, self.month as i64, self.day as i64)
            .and_then(|days| {
                let hour = self.hour as i64;
                let minute = self.minute as i64;
                let second = self.second as i64;
                if hour > 23 || minute > 59 || second > 59 {
                    return None;
                }
                let seconds_of_day = hour * 3600 + minute * 60 + second;
                let millis = self.milliseconds as i64;
                Some(
                    days * 86_400_000_000_000
                        + seconds_of_day * 1_000_000_000
                        + millis * 1_000_000,
                )
            })
            .unwrap_or(0)
    }
}

/// Howard Hinnant's days-from-civil algorithm, restricted to the range
/// this format can plausibly encode. Returns `None` for an invalid
/// month/day rather than producing a silently wrong date.
fn days_from_civil(year: i64, month: i64, day: i64) -> Option<i64> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    let y = if month <= 2 { year - 1 } else { year };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64; // [0, 399]
    let mp = (month + 9) % 12; // [0, 11], Mar=0 .. Feb=11
    let doy = (153 * mp + 2) / 5 + day - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    Some(era * 146_097 + doe - 719_468)
}

/// The file header every BLF file opens with.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub header_size: u32,
    pub application_id: u8,
    pub application_major: u8,
    pub application_minor: u8,
    pub application_build: u8,
    pub file_size: u64,
    pub uncompressed_file_size: u64,
    pub object_count: u32,
    pub measurement_start_time: CalendarTime,
    pub last_object_time: CalendarTime,
}

/// Metadata returned to the caller at `open()` time (§6 consumer interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub object_count: u32,
    pub start_ns: i64,
    pub stop_ns: i64,
}

impl FileHeader {
    /// Reads the file header from a source positioned at offset 0, leaving
    /// the source positioned just past `header_size` total bytes.
    pub fn read<R: Read>(reader: &mut R) -> BlfResult<Self> {
        let mut fixed = vec![0u8; FILE_HEADER_FIXED_SIZE as usize];
        read_exact_at(reader, &mut fixed, 0)?;
        let mut cursor = Cursor::new(&fixed[..]);

        let signature = cursor
            .read_u32::<LittleEndian>()
            .map_err(|e| BlfError::Io { offset: 0, source: e })?;
        if signature != FILE_SIGNATURE {
            return Err(BlfError::InvalidFileMagic { offset: 0 });
        }
        let header_size = read_u32(&mut cursor, 4)?;
        let _crc = read_u32(&mut cursor, 8)?;
        let application_id = read_u8(&mut cursor, 12)?;
        let _compression_level = read_u8(&mut cursor, 13)?;
        let application_major = read_u8(&mut cursor, 14)?;
        let application_minor = read_u8(&mut cursor, 15)?;
        let file_size = read_u64(&mut cursor, 16)?;
        let uncompressed_file_size = read_u64(&mut cursor, 24)?;
        let object_count = read_u32(&mut cursor, 32)?;
        let application_build = read_u8(&mut cursor, 36)?;
        cursor.set_position(cursor.position() + 3); // alignment padding
        let measurement_start_time = CalendarTime::read(&mut cursor)?;
        let last_object_time = CalendarTime::read(&mut cursor)?;

        if header_size > FILE_HEADER_FIXED_SIZE {
            let tail_len = (header_size - FILE_HEADER_FIXED_SIZE) as usize;
            let mut tail = vec![0u8; tail_len];
            read_exact_at(reader, &mut tail, FILE_HEADER_FIXED_SIZE as u64)?;
        }

        Ok(FileHeader {
            header_size,
            application_id,
            application_major,
            application_minor,
            application_build,
            file_size,
            uncompressed_file_size,
            object_count,
            measurement_start_time,
            last_object_time,
        })
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            object_count: self.object_count,
            start_ns: self.measurement_start_time.to_epoch_nanos(),
            stop_ns: self.last_object_time.to_epoch_nanos(),
        }
    }
}

fn read_exact_at<R: Read>(reader: &mut R, buf: &mut [u8], offset: u64) -> BlfResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            BlfError::Truncated {
                offset,
                what: "file header",
                needed: buf.len(),
                got: 0,
            }
        } else {
            BlfError::Io { offset, source: e }
        }
    })
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

fn read_u8(cursor: &mut Cursor<&[u8]>, offset: u64) -> BlfResult<u8> {
    cursor
        .read_u8()
        .map_err(|e| BlfError::Io { offset, source: e })
}
