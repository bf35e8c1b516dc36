//! Codec for the UDP discovery packet.
//!
//! Packet format (all integers big-endian):
//! ```text
//! +--------+--------+---------------------------------+
//! | Type   | Length |  TLV records                    |
//! | u16 BE | u16 BE |  tag u8, len varlen, value      |
//! +--------+--------+---------------------------------+
//! | 2 bytes| 2 bytes|  Length bytes                   |
//! ```
//!
//! The request we send carries no trailing checksum. Replies may carry one
//! after the payload; it is ignored.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// UDP port the tuner listens on for discovery.
pub const DISCOVER_PORT: u16 = 65001;

/// Packet type of a discover request.
pub const TYPE_DISCOVER_REQUEST: u16 = 0x0002;

/// Packet type of a discover reply.
pub const TYPE_DISCOVER_REPLY: u16 = 0x0003;

/// TLV tag carrying the device type.
pub const TAG_DEVICE_TYPE: u8 = 0x01;

/// TLV tag carrying the device id.
pub const TAG_DEVICE_ID: u8 = 0x02;

/// Device type value for a tuner.
pub const DEVICE_TYPE_TUNER: u32 = 0x0000_0001;

/// Device id value sent in the request.
const REQUEST_DEVICE_ID: u32 = 0x0000_0001;

/// Header size: 2 (type) + 2 (length).
const HEADER_SIZE: usize = 4;

/// Size of the encoded discover request.
pub const DISCOVER_REQUEST_SIZE: usize = 16;

/// Encode the fixed discover request.
pub fn encode_discover_request() -> Bytes {
    let mut payload = BytesMut::with_capacity(DISCOVER_REQUEST_SIZE - HEADER_SIZE);
    put_u32_tag(&mut payload, TAG_DEVICE_TYPE, DEVICE_TYPE_TUNER);
    put_u32_tag(&mut payload, TAG_DEVICE_ID, REQUEST_DEVICE_ID);

    let mut packet = BytesMut::with_capacity(DISCOVER_REQUEST_SIZE);
    packet.put_u16(TYPE_DISCOVER_REQUEST);
    packet.put_u16(payload.len() as u16);
    packet.put_slice(&payload);
    packet.freeze()
}

fn put_u32_tag(buf: &mut BytesMut, tag: u8, value: u32) {
    buf.put_u8(tag);
    buf.put_u8(4);
    buf.put_u32(value);
}

/// Fields of a discover reply that are worth logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverReply {
    pub device_type: Option<u32>,
    pub device_id: Option<u32>,
}

/// Decode a discover reply.
///
/// Unknown tags are skipped. Bytes after the announced payload length are
/// ignored.
pub fn decode_discover_reply(data: &[u8]) -> Result<DiscoverReply, ProtocolError> {
    if data.len() < HEADER_SIZE {
        return Err(ProtocolError::TooShort(data.len()));
    }

    let mut buf = data;
    let packet_type = buf.get_u16();
    let length = buf.get_u16() as usize;

    if packet_type != TYPE_DISCOVER_REPLY {
        return Err(ProtocolError::UnexpectedType(packet_type));
    }
    if buf.remaining() < length {
        return Err(ProtocolError::IncompletePacket {
            expected: length,
            actual: buf.remaining(),
        });
    }

    let mut payload = &buf[..length];
    let mut reply = DiscoverReply::default();

    while payload.has_remaining() {
        let tag = payload.get_u8();
        let len = read_varlen(&mut payload).ok_or(ProtocolError::TruncatedTag(tag))?;
        if payload.remaining() < len {
            return Err(ProtocolError::TruncatedTag(tag));
        }
        let mut value = &payload[..len];

        match (tag, len) {
            (TAG_DEVICE_TYPE, 4) => reply.device_type = Some(value.get_u32()),
            (TAG_DEVICE_ID, 4) => reply.device_id = Some(value.get_u32()),
            _ => {}
        }

        payload.advance(len);
    }

    Ok(reply)
}

/// Read a TLV length: one byte, or two when the high bit of the first is set.
fn read_varlen(buf: &mut &[u8]) -> Option<usize> {
    if !buf.has_remaining() {
        return None;
    }
    let first = buf.get_u8() as usize;
    if first & 0x80 == 0 {
        return Some(first);
    }
    if !buf.has_remaining() {
        return None;
    }
    let second = buf.get_u8() as usize;
    Some((first & 0x7F) | (second << 7))
}
