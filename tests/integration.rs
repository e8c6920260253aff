//! End-to-end tests against the public API: build a synthetic BLF byte
//! stream by hand and drive it through `open_sequential`.

use blf::{open_sequential, BlfError, DecodedFrame, Envelope};

const OBJECT_SIGNATURE: u32 = 0x4A424F4C;
const FILE_SIGNATURE: u32 = 0x47474F4C;
const BASE_HEADER_SIZE: usize = 16;
const LOG_CONTAINER: u32 = 10;
const CAN_MESSAGE: u32 = 1;
const CAN_FD_MESSAGE: u32 = 100;
const ETHERNET_FRAME_EX: u32 = 134;
const TIME_TEN_MICS: u32 = 0x1;

fn file_header(object_count: u32) -> Vec<u8> {
    let mut v = vec![0u8; 144];
    v[0..4].copy_from_slice(&FILE_SIGNATURE.to_le_bytes());
    v[4..8].copy_from_slice(&144u32.to_le_bytes());
    v[32..36].copy_from_slice(&object_count.to_le_bytes());
    v
}

fn container(compression_method: u16, payload: &[u8], uncompressed_len: usize) -> Vec<u8> {
    let object_size = (BASE_HEADER_SIZE + 8 + payload.len()) as u32;
    let mut v = Vec::new();
    v.extend_from_slice(&OBJECT_SIGNATURE.to_le_bytes());
    v.extend_from_slice(&(BASE_HEADER_SIZE as u16).to_le_bytes());
    v.extend_from_slice(&2u16.to_le_bytes());
    v.extend_from_slice(&object_size.to_le_bytes());
    v.extend_from_slice(&LOG_CONTAINER.to_le_bytes());
    v.extend_from_slice(&compression_method.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&(uncompressed_len as u32).to_le_bytes());
    v.extend_from_slice(payload);
    let padding = (object_size as usize) % 4;
    v.extend(std::iter::repeat(0u8).take(padding));
    v
}

fn extended_header_v2(flags: u32, timestamp: u64) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&flags.to_le_bytes());
    v.push(0);
    v.push(0);
    v.extend_from_slice(&0u16.to_le_bytes());
    v.extend_from_slice(&timestamp.to_le_bytes());
    v.extend_from_slice(&0u64.to_le_bytes());
    v
}

fn inner_object(object_type: u32, no_pad: bool, flags: u32, timestamp: u64, body: &[u8]) -> Vec<u8> {
    let ext = extended_header_v2(flags, timestamp);
    let object_size = (BASE_HEADER_SIZE + ext.len() + body.len()) as u32;
    let mut v = Vec::new();
    v.extend_from_slice(&OBJECT_SIGNATURE.to_le_bytes());
    v.extend_from_slice(&(BASE_HEADER_SIZE as u16).to_le_bytes());
    v.extend_from_slice(&2u16.to_le_bytes());
    v.extend_from_slice(&object_size.to_le_bytes());
    v.extend_from_slice(&object_type.to_le_bytes());
    v.extend_from_slice(&ext);
    v.extend_from_slice(body);
    if !no_pad {
        let padding = (object_size as usize) % 4;
        v.extend(std::iter::repeat(0u8).take(padding));
    }
    v
}

fn can_classic_body(channel: u16, can_id: u32) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&channel.to_le_bytes());
    v.push(0);
    v.push(8);
    v.extend_from_slice(&can_id.to_le_bytes());
    v.extend_from_slice(&[0u8; 8]);
    v
}

#[test]
fn empty_file_yields_no_frames() {
    let bytes = file_header(0);
    let (meta, reframer) = open_sequential(&bytes[..]).unwrap();
    assert_eq!(meta.object_count, 0);

    let mut count = 0;
    reframer
        .run(&mut |_: Envelope<'_>| {
            count += 1;
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn one_uncompressed_can_classic_frame() {
    let body = can_classic_body(2, 0x7ff);
    let obj = inner_object(CAN_MESSAGE, false, 0, 1_000, &body);
    let c = container(0, &obj, obj.len());

    let mut bytes = file_header(1);
    bytes.extend(c);

    let (_, reframer) = open_sequential(&bytes[..]).unwrap();
    let mut can_ids = Vec::new();
    reframer
        .run(&mut |e: Envelope<'_>| {
            if let Some(DecodedFrame::Can(f)) = e.frame {
                can_ids.push(f.can_id);
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(can_ids, vec![0x7ff]);
}

fn can_fd_body(can_id: u32, valid_data_bytes: u8) -> Vec<u8> {
    // CAN_FD_MESSAGE body: channel(2) flags(1) dlc(1) can_id(4) frame_length(4)
    // arb_bit_count(1) fd_flags(1) valid_data_bytes(1) reserved1(1) + data.
    let mut body = Vec::new();
    body.extend_from_slice(&0u16.to_le_bytes());
    body.push(0);
    body.push(8);
    body.extend_from_slice(&can_id.to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());
    body.push(0);
    body.push(0x01 | 0x02); // fdf | brs, esi clear
    body.push(valid_data_bytes);
    body.push(0);
    body.extend_from_slice(&vec![0xAAu8; valid_data_bytes as usize]);
    body
}

#[test]
fn one_zlib_can_fd_container() {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    // Two back-to-back CAN-FD frames inside one zlib-compressed container,
    // to exercise sequential reframing of a decompressed buffer.
    let body1 = can_fd_body(0x55, 16);
    let body2 = can_fd_body(0x66, 16);
    let obj1 = inner_object(CAN_FD_MESSAGE, false, 0, 42, &body1);
    let obj2 = inner_object(CAN_FD_MESSAGE, false, 0, 43, &body2);
    let mut combined = obj1;
    combined.extend_from_slice(&obj2);

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&combined).unwrap();
    let compressed = encoder.finish().unwrap();
    let c = container(2, &compressed, combined.len());

    let mut bytes = file_header(1);
    bytes.extend(c);

    let (_, reframer) = open_sequential(&bytes[..]).unwrap();
    let mut seen = Vec::new();
    reframer
        .run(&mut |e: Envelope<'_>| {
            if let Some(DecodedFrame::Can(f)) = e.frame {
                seen.push((f.can_id, f.fdf, f.brs, f.esi, f.data.len()));
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![(0x55, true, true, false, 16), (0x66, true, true, false, 16)]);
}

#[test]
fn ethernet_ex_tagged_frame_decodes() {
    // reserved(2) flags(2) channel(2) hw_channel(2) reserved(2) checksum(2)
    // dir(2) frame_length(2) frame_handle(2) reserved(2)
    let mut body = vec![0u8; 20];
    body[8..10].copy_from_slice(&60u16.to_le_bytes()); // frame_length
    let mut data = vec![0u8; 60];
    data[0..6].copy_from_slice(&[0xAA; 6]);
    data[6..12].copy_from_slice(&[0xBB; 6]);
    data[12..14].copy_from_slice(&0x8100u16.to_le_bytes()); // vlan tpid
    data[14..16].copy_from_slice(&0x2123u16.to_le_bytes()); // vlan tci
    data[16..18].copy_from_slice(&0x0800u16.to_le_bytes()); // eth_type
    body.extend_from_slice(&data);

    let obj = inner_object(ETHERNET_FRAME_EX, true, 0, 9, &body);
    let c = container(0, &obj, obj.len());

    let mut bytes = file_header(1);
    bytes.extend(c);

    let (_, reframer) = open_sequential(&bytes[..]).unwrap();
    let mut seen = Vec::new();
    reframer
        .run(&mut |e: Envelope<'_>| {
            if let Some(DecodedFrame::Ethernet(f)) = e.frame {
                seen.push((f.vlan_pri, f.vlan_id, f.eth_type, f.data.len()));
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![(Some(2), Some(0x123), 0x0800, 42)]);
}

#[test]
fn ten_microsecond_timestamps_are_scaled_to_nanoseconds() {
    let body = can_classic_body(0, 1);
    let obj = inner_object(CAN_MESSAGE, false, TIME_TEN_MICS, 7, &body);
    let c = container(0, &obj, obj.len());

    let mut bytes = file_header(1);
    bytes.extend(c);

    let (_, reframer) = open_sequential(&bytes[..]).unwrap();
    let mut times = Vec::new();
    reframer
        .run(&mut |e: Envelope<'_>| {
            times.push(e.time_ns);
            Ok(())
        })
        .unwrap();
    assert_eq!(times, vec![70_000]);
}

#[test]
fn truncated_container_payload_is_fatal() {
    let body = can_classic_body(0, 1);
    let obj = inner_object(CAN_MESSAGE, false, 0, 1, &body);
    let mut c = container(0, &obj, obj.len());
    c.truncate(c.len() - 4);

    let mut bytes = file_header(1);
    bytes.extend(c);

    let (_, reframer) = open_sequential(&bytes[..]).unwrap();
    let err = reframer.run(&mut |_: Envelope<'_>| Ok(())).unwrap_err();
    assert!(matches!(err, BlfError::Truncated { .. }));
}
