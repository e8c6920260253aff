//! CAN classic, CAN-FD, and CAN-FD-64 payload decoders.

use byteorder::{LittleEndian, ReadBytesExt};
use std::borrow::Cow;
use std::io::Cursor;

use crate::error::{BlfError, BlfResult};
use crate::object_type::ObjectType;

const DIR_MASK: u8 = 0x03;
const RTR_MASK: u8 = 0x80;

const FDF_FLAG: u8 = 0x01;
const BRS_FLAG: u8 = 0x02;
const ESI_FLAG: u8 = 0x04;

const FDF_64_FLAG: u32 = 0x01;
const BRS_64_FLAG: u32 = 0x02;
const ESI_64_FLAG: u32 = 0x04;
const RTR_64_FLAG: u32 = 0x08;

/// Maps a classic CAN `dlc` nibble to the number of data bytes it encodes.
/// CAN-FD's `dlc` values above 8 use a non-linear table; classic DLC is
/// identity up to 8 and otherwise invalid.
pub fn dlc_to_len(dlc: u8) -> usize {
    match dlc {
        0..=8 => dlc as usize,
        9 => 12,
        10 => 16,
        11 => 20,
        12 => 24,
        13 => 32,
        14 => 48,
        15 => 64,
        _ => 0,
    }
}

/// A decoded CAN frame (classic, FD, or FD-64), generic over the lifetime
/// of its data slice: borrowed when decoded straight out of a container
/// buffer, owned when decoded out of a ring-buffer read that already
/// copied.
#[derive(Debug, Clone, PartialEq)]
pub struct CanFrame<'a> {
    pub channel: u16,
    pub dir: u8,
    pub can_id: u32,
    pub dlc: u8,
    pub rtr: bool,
    pub fdf: bool,
    pub brs: bool,
    pub esi: bool,
    pub data: Cow<'a, [u8]>,
}

fn truncation(offset: u64, what: &'static str, needed: usize, got: usize) -> BlfError {
    BlfError::Truncated {
        offset,
        what,
        needed,
        got,
    }
}

/// Decodes `CAN_MESSAGE` / `CAN_MESSAGE2`: fixed 8-byte payload regardless
/// of `dlc`.
pub fn decode_can_classic(payload: &[u8], offset: u64) -> BlfResult<CanFrame<'_>> {
    const STRUCT_SIZE: usize = 8; // channel(2) + flags(1) + dlc(1) + can_id(4)
    if payload.len() < STRUCT_SIZE + 8 {
        return Err(truncation(offset, "CAN classic message", STRUCT_SIZE + 8, payload.len()));
    }
    let mut cursor = Cursor::new(payload);
    let channel = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let flags = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let dlc = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let can_id = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let data = &payload[STRUCT_SIZE..STRUCT_SIZE + 8];

    Ok(CanFrame {
        channel,
        dir: flags & DIR_MASK,
        can_id,
        dlc,
        rtr: flags & RTR_MASK != 0,
        fdf: false,
        brs: false,
        esi: false,
        data: Cow::Borrowed(data),
    })
}

/// Decodes `CAN_FD_MESSAGE`.
pub fn decode_can_fd(payload: &[u8], offset: u64) -> BlfResult<CanFrame<'_>> {
    // channel(2) + flags(1) + dlc(1) + can_id(4) + frame_length(4)
    // + arb_bit_count(1) + fd_flags(1) + valid_data_bytes(1) + reserved1(1)
    const STRUCT_SIZE: usize = 16;
    if payload.len() < STRUCT_SIZE {
        return Err(truncation(offset, "CAN-FD message", STRUCT_SIZE, payload.len()));
    }
    let mut cursor = Cursor::new(payload);
    let channel = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let flags = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let dlc = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let can_id = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _frame_length = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _arb_bit_count = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let fd_flags = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let valid_data_bytes = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })? as usize;

    if payload.len() < STRUCT_SIZE + valid_data_bytes {
        return Err(truncation(
            offset,
            "CAN-FD message data",
            STRUCT_SIZE + valid_data_bytes,
            payload.len(),
        ));
    }
    let data = &payload[STRUCT_SIZE..STRUCT_SIZE + valid_data_bytes];

    Ok(CanFrame {
        channel,
        dir: flags & DIR_MASK,
        can_id,
        dlc,
        rtr: false,
        fdf: fd_flags & FDF_FLAG != 0,
        brs: fd_flags & BRS_FLAG != 0,
        esi: fd_flags & ESI_FLAG != 0,
        data: Cow::Borrowed(data),
    })
}

/// Decodes `CAN_FD_MESSAGE_64`, whose `dir` is an explicit field rather
/// than derived from the flag bits.
pub fn decode_can_fd_64(payload: &[u8], offset: u64) -> BlfResult<CanFrame<'_>> {
    const STRUCT_SIZE: usize = 40;
    if payload.len() < STRUCT_SIZE {
        return Err(truncation(offset, "CAN-FD-64 message", STRUCT_SIZE, payload.len()));
    }
    let mut cursor = Cursor::new(payload);
    let channel = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })? as u16;
    let dlc = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let valid_data_bytes = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })? as usize;
    let _tx_count = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let can_id = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _frame_length = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let flags = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _btr_cfg_arb = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _btr_cfg_data = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _time_offset_brs_ns = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _time_offset_crc_del_ns = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let _bit_count = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let dir = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let _ext_data_offset = cursor.read_u8().map_err(|e| BlfError::Io { offset, source: e })?;
    let _crc = cursor
        .read_u32::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;

    if payload.len() < STRUCT_SIZE + valid_data_bytes {
        return Err(truncation(
            offset,
            "CAN-FD-64 message data",
            STRUCT_SIZE + valid_data_bytes,
            payload.len(),
        ));
    }
    let data = &payload[STRUCT_SIZE..STRUCT_SIZE + valid_data_bytes];

    Ok(CanFrame {
        channel,
        dir,
        can_id,
        dlc,
        rtr: flags & RTR_64_FLAG != 0,
        fdf: flags & FDF_64_FLAG != 0,
        brs: flags & BRS_64_FLAG != 0,
        esi: flags & ESI_64_FLAG != 0,
        data: Cow::Borrowed(data),
    })
}

/// Dispatches to the right CAN decoder for `object_type`, or `None` if
/// `object_type` is not a CAN variant this core decodes.
pub fn decode_can(object_type: ObjectType, payload: &[u8], offset: u64) -> Option<BlfResult<CanFrame<'_>>> {
    match object_type {
        ObjectType::CanMessage | ObjectType::CanMessage2 => Some(decode_can_classic(payload, offset)),
        ObjectType::CanFdMessage => Some(decode_can_fd(payload, offset)),
        ObjectType::CanFdMessage64 => Some(decode_can_fd_64(payload, offset)),
        _ => None,
    }
}
