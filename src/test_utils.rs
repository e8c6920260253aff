//! Synthetic BLF byte construction shared by unit and integration tests.

use crate::object_header::{BASE_HEADER_SIZE, OBJECT_SIGNATURE};
use crate::object_type::ObjectType;

/// `compression_method(u32) + uncompressed_size_hint(u32)`, matching
/// `container::CONTAINER_SUBHEADER_SIZE`.
const CONTAINER_SUBHEADER_SIZE: usize = 8;

/// Builds one on-wire log container: base header + sub-header + payload
/// + alignment padding, with `uncompressed_size_hint` set to `payload.len()`.
/// Callers compressing with zlib should patch the hint afterward to the
/// real uncompressed length.
pub fn build_container(compression_method: u16, payload: &[u8]) -> Vec<u8> {
    let object_size = (BASE_HEADER_SIZE + CONTAINER_SUBHEADER_SIZE + payload.len()) as u32;
    let mut v = Vec::new();
    v.extend_from_slice(&OBJECT_SIGNATURE.to_le_bytes());
    v.extend_from_slice(&(BASE_HEADER_SIZE as u16).to_le_bytes());
    v.extend_from_slice(&2u16.to_le_bytes()); // header_version
    v.extend_from_slice(&object_size.to_le_bytes());
    v.extend_from_slice(&(ObjectType::LogContainer as u32).to_le_bytes());

    v.extend_from_slice(&compression_method.to_le_bytes());
    v.extend_from_slice(&0u16.to_le_bytes()); // reserved
    v.extend_from_slice(&(payload.len() as u32).to_le_bytes()); // uncompressed size hint

    v.extend_from_slice(payload);

    let padding = (object_size as usize) % 4;
    v.extend(std::iter::repeat(0u8).take(padding));
    v
}

/// Builds a v2 extended header with the given flags and timestamp.
pub fn build_extended_header_v2(flags: u32, timestamp: u64) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&flags.to_le_bytes());
    v.push(0); // time_stamp_status
    v.push(0); // reserved
    v.extend_from_slice(&0u16.to_le_bytes()); // object_version
    v.extend_from_slice(&timestamp.to_le_bytes());
    v.extend_from_slice(&0u64.to_le_bytes()); // original_timestamp
    v
}

/// Builds a full inner object: base header + v2 extended header + body,
/// padded per `object_type`'s alignment rule.
pub fn build_inner_object(object_type: ObjectType, flags: u32, timestamp: u64, body: &[u8]) -> Vec<u8> {
    let ext = build_extended_header_v2(flags, timestamp);
    let object_size = (BASE_HEADER_SIZE + ext.len() + body.len()) as u32;

    let mut v = Vec::new();
    v.extend_from_slice(&OBJECT_SIGNATURE.to_le_bytes());
    v.extend_from_slice(&(BASE_HEADER_SIZE as u16).to_le_bytes());
    v.extend_from_slice(&2u16.to_le_bytes());
    v.extend_from_slice(&object_size.to_le_bytes());
    v.extend_from_slice(&(object_type as u32).to_le_bytes());
    v.extend_from_slice(&ext);
    v.extend_from_slice(body);

    if !object_type.advances_without_padding() {
        let padding = (object_size as usize) % 4;
        v.extend(std::iter::repeat(0u8).take(padding));
    }
    v
}

/// Builds a minimal valid file header (the fixed 144-byte block only).
pub fn build_file_header(object_count: u32) -> Vec<u8> {
    let mut v = vec![0u8; 144];
    v[0..4].copy_from_slice(&crate::file_header::FILE_SIGNATURE.to_le_bytes());
    v[4..8].copy_from_slice(&144u32.to_le_bytes()); // header_size
    v[32..36].copy_from_slice(&object_count.to_le_bytes());
    v
}
