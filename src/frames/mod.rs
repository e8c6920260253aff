//! Type-specific frame decoders and the tagged variant the reframer
//! dispatches into.

pub mod can;
pub mod ethernet;

pub use can::CanFrame;
pub use ethernet::EthernetFrame;

use crate::error::BlfResult;
use crate::object_type::ObjectType;

/// A decoded inner object. `Unknown` covers every object type this core
/// does not decode into a typed record (LIN, FlexRay, MOST, and so on);
/// those objects are still yielded as envelopes with `decoded_frame_or_none`
/// set to `None` so downstream tooling can count or log them.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedFrame<'a> {
    Can(CanFrame<'a>),
    Ethernet(EthernetFrame<'a>),
}

/// Dispatches on `object_type` to the matching decoder, or returns `Ok(None)`
/// for a type this core treats as opaque. A decode *failure* for a
/// recognized type is still propagated as an error, not silently dropped.
pub fn decode(object_type: ObjectType, payload: &[u8], offset: u64) -> BlfResult<Option<DecodedFrame<'_>>> {
    if let Some(result) = can::decode_can(object_type, payload, offset) {
        return result.map(|f| Some(DecodedFrame::Can(f)));
    }
    match object_type {
        ObjectType::EthernetFrame => ethernet::decode_ethernet(payload, offset).map(|f| Some(DecodedFrame::Ethernet(f))),
        ObjectType::EthernetFrameEx => {
            ethernet::decode_ethernet_ex(payload, offset).map(|f| Some(DecodedFrame::Ethernet(f)))
        }
        _ => Ok(None),
    }
}
