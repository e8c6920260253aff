//! Ethernet and Ethernet-Ex payload decoders.

use byteorder::{LittleEndian, ReadBytesExt};
use std::borrow::Cow;
use std::io::{Cursor, Read};

use crate::error::{BlfError, BlfResult};

const VALID_HW_CHANNEL: u16 = 0x8000;
const VLAN_TAG_TPIDS: [u16; 3] = [0x8100, 0x8800, 0x9100];

fn truncation(offset: u64, what: &'static str, needed: usize, got: usize) -> BlfError {
    BlfError::Truncated {
        offset,
        what,
        needed,
        got,
    }
}

/// A decoded Ethernet frame, classic or Ex. `-1` sentinels (modeled as
/// `Option::None`) stand in for "not applicable"/"not valid" fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EthernetFrame<'a> {
    pub channel: u16,
    pub hw_channel: Option<u16>,
    pub dir: u16,
    pub mac_da: [u8; 6],
    pub mac_sa: [u8; 6],
    pub vlan_tpid: Option<u16>,
    pub vlan_pri: Option<u8>,
    pub vlan_id: Option<u16>,
    pub eth_type: u16,
    pub data: Cow<'a, [u8]>,
}

/// Decodes `ETHERNET_FRAME`.
///
/// This extracts `vlan_id` with the literal 6-bit mask `0x3F`, matching
/// both the text of the framing rules and the reference decoder; see
/// `DESIGN.md` for why this is kept deliberately, despite `0xFFF` being
/// the value Ethernet-Ex uses for the same field.
pub fn decode_ethernet(payload: &[u8], offset: u64) -> BlfResult<EthernetFrame<'_>> {
    const STRUCT_SIZE: usize = 24;
    if payload.len() < STRUCT_SIZE {
        return Err(truncation(offset, "Ethernet frame", STRUCT_SIZE, payload.len()));
    }
    let mut cursor = Cursor::new(payload);
    let mut mac_sa = [0u8; 6];
    cursor
        .read_exact(&mut mac_sa)
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let channel = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let mut mac_da = [0u8; 6];
    cursor
        .read_exact(&mut mac_da)
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let dir = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let eth_type = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let vlan_tpid = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let vlan_tci = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })?;
    let frame_length = cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })? as usize;

    if payload.len() < STRUCT_SIZE + frame_length {
        return Err(truncation(
            offset,
            "Ethernet frame data",
            STRUCT_SIZE + frame_length,
            payload.len(),
        ));
    }
    let data = &payload[STRUCT_SIZE..STRUCT_SIZE + frame_length];

    Ok(EthernetFrame {
        channel,
        hw_channel: None,
        dir,
        mac_da,
        mac_sa,
        vlan_tpid: Some(vlan_tpid),
        vlan_pri: Some(((vlan_tci >> 12) & 0x03) as u8),
        vlan_id: Some(vlan_tci & 0x3F),
        eth_type,
        data: Cow::Borrowed(data),
    })
}

/// Decodes `ETHERNET_FRAME_EX`, including the VLAN-tag sniffing logic
/// that inspects the raw frame bytes rather than a dedicated field.
pub fn decode_ethernet_ex(payload: &[u8], offset: u64) -> BlfResult<EthernetFrame<'_>> {
    // reserved(2) + flags(2) + channel(2) + hw_channel(2) + reserved(2)
    // + checksum(2) + dir(2) + frame_length(2) + frame_handle(2) + reserved(2)
    const STRUCT_SIZE: usize = 20;
    if payload.len() < STRUCT_SIZE {
        return Err(truncation(offset, "Ethernet-Ex frame", STRUCT_SIZE, payload.len()));
    }
    let mut cursor = Cursor::new(payload);
    let _reserved0 = read_u16(&mut cursor, offset)?;
    let flags = read_u16(&mut cursor, offset)?;
    let channel = read_u16(&mut cursor, offset)?;
    let hw_channel_raw = read_u16(&mut cursor, offset)?;
    let _reserved1 = read_u16(&mut cursor, offset)?;
    let _checksum = read_u16(&mut cursor, offset)?;
    let dir = read_u16(&mut cursor, offset)?;
    let frame_length = read_u16(&mut cursor, offset)? as usize;
    let _frame_handle = read_u16(&mut cursor, offset)?;
    let _reserved2 = read_u16(&mut cursor, offset)?;

    if frame_length <= 14 {
        return Err(BlfError::MalformedObject {
            offset,
            what: "Ethernet-Ex frame",
            reason: "frame_length <= 14",
        });
    }
    if payload.len() < STRUCT_SIZE + frame_length {
        return Err(truncation(
            offset,
            "Ethernet-Ex frame data",
            STRUCT_SIZE + frame_length,
            payload.len(),
        ));
    }
    let data = &payload[STRUCT_SIZE..STRUCT_SIZE + frame_length];

    let hw_channel = if flags & VALID_HW_CHANNEL != 0 {
        Some(hw_channel_raw)
    } else {
        None
    };

    if frame_length > 18 {
        let vlan_tpid = u16::from_le_bytes([data[12], data[13]]);
        if VLAN_TAG_TPIDS.contains(&vlan_tpid) {
            let vlan_tci = u16::from_le_bytes([data[14], data[15]]);
            let eth_type = u16::from_le_bytes([data[16], data[17]]);
            let mut mac_da = [0u8; 6];
            let mut mac_sa = [0u8; 6];
            mac_da.copy_from_slice(&data[0..6]);
            mac_sa.copy_from_slice(&data[6..12]);
            return Ok(EthernetFrame {
                channel,
                hw_channel,
                dir,
                mac_da,
                mac_sa,
                vlan_tpid: Some(vlan_tpid),
                vlan_pri: Some(((vlan_tci >> 12) & 0x03) as u8),
                vlan_id: Some(vlan_tci & 0xFFF),
                eth_type,
                data: Cow::Owned(data[18..].to_vec()),
            });
        }
    }

    // Untagged: the bytes at offset 12..14 are eth_type, not a VLAN TPID.
    let eth_type = u16::from_le_bytes([data[12], data[13]]);
    let mut mac_da = [0u8; 6];
    let mut mac_sa = [0u8; 6];
    mac_da.copy_from_slice(&data[0..6]);
    mac_sa.copy_from_slice(&data[6..12]);
    Ok(EthernetFrame {
        channel,
        hw_channel,
        dir,
        mac_da,
        mac_sa,
        vlan_tpid: None,
        vlan_pri: None,
        vlan_id: None,
        eth_type,
        data: Cow::Owned(data[14..].to_vec()),
    })
}

fn read_u16(cursor: &mut Cursor<&[u8]>, offset: u64) -> BlfResult<u16> {
    cursor
        .read_u16::<LittleEndian>()
        .map_err(|e| BlfError::Io { offset, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_vlan_id_uses_6_bit_mask() {
        // vlan_tci = 0x2FFF -> pri = 2, and with the literal 6-bit mask
        // vlan_id = 0x3F, NOT 0xFFF. This test pins the documented
        // deviation from the "obviously correct" 12-bit mask.
        let mut payload = vec![0u8; 24];
        payload[12..14].copy_from_slice(&0x2FFFu16.to_le_bytes()); // vlan_tci
        let frame = decode_ethernet(&payload, 0).unwrap();
        assert_eq!(frame.vlan_pri, Some(2));
        assert_eq!(frame.vlan_id, Some(0x3F));
    }

    #[test]
    fn ex_tagged_frame_uses_12_bit_mask() {
        let mut payload = vec![0u8; 20];
        payload[8..10].copy_from_slice(&60u16.to_le_bytes()); // frame_length
        let mut data = vec![0u8; 60];
        data[0..6].copy_from_slice(&[0xAA; 6]); // mac_da
        data[6..12].copy_from_slice(&[0xBB; 6]); // mac_sa
        data[12..14].copy_from_slice(&0x8100u16.to_le_bytes()); // vlan_tpid
        data[14..16].copy_from_slice(&0x2123u16.to_le_bytes()); // vlan_tci
        data[16..18].copy_from_slice(&0x0800u16.to_le_bytes()); // eth_type
        payload.extend_from_slice(&data);

        let frame = decode_ethernet_ex(&payload, 0).unwrap();
        assert_eq!(frame.vlan_pri, Some(2));
        assert_eq!(frame.vlan_id, Some(0x123));
        assert_eq!(frame.eth_type, 0x0800);
        assert_eq!(frame.data.len(), 60 - 18);
    }

    #[test]
    fn ex_untagged_frame_has_no_vlan() {
        let mut payload = vec![0u8; 20];
        payload[8..10].copy_from_slice(&30u16.to_le_bytes()); // frame_length
        let mut data = vec![0u8; 30];
        data[12..14].copy_from_slice(&0x0800u16.to_le_bytes()); // eth_type (not a vlan tpid)
        payload.extend_from_slice(&data);

        let frame = decode_ethernet_ex(&payload, 0).unwrap();
        assert_eq!(frame.vlan_tpid, None);
        assert_eq!(frame.vlan_id, None);
        assert_eq!(frame.eth_type, 0x0800);
        assert_eq!(frame.data.len(), 30 - 14);
    }

    #[test]
    fn ex_short_frame_length_is_fatal() {
        let mut payload = vec![0u8; 20];
        payload[8..10].copy_from_slice(&10u16.to_le_bytes()); // frame_length <= 14
        let err = decode_ethernet_ex(&payload, 7).unwrap_err();
        assert!(matches!(err, BlfError::MalformedObject { offset: 7, .. }));
    }
}
