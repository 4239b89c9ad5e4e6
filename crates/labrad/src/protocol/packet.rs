// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Packet wire codec.
//!
//! Layout, all big-endian:
//!
//! ```text
//! u32  context.high
//! u32  context.low
//! i32  request
//! u32  target
//! u32  records length in bytes
//! ...  records, each:
//!      u32   record id
//!      u32   tag length
//!      bytes type tag (ISO-8859-1)
//!      u32   payload length
//!      bytes flattened data
//! ```
//!
//! Writers assemble the records region in a scratch buffer, then emit the
//! 20-byte header followed by the records, and flush so a waiting peer
//! sees the packet immediately. Readers consume exactly the advertised
//! records length and preserve record order.

use super::{Context, PacketError, Record};
use crate::data::{Data, DataError};
use crate::types::Type;
use crate::wire::{bytes, latin1, Cursor, WireError};
use crate::{debug, warn};
use std::io::{Read, Write};

const HEADER_LEN: usize = 20;

/// A framed unit of communication: context, target, request id, records.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub context: Context,
    pub target: u32,
    pub request: i32,
    pub records: Vec<Record>,
}

impl Packet {
    pub fn new(context: Context, target: u32, request: i32, records: Vec<Record>) -> Self {
        Self {
            context,
            target,
            request,
            records,
        }
    }

    /// An outgoing request expecting a response with the same id.
    pub fn is_request(&self) -> bool {
        self.request > 0
    }

    /// A response to the request `-self.request`.
    pub fn is_response(&self) -> bool {
        self.request < 0
    }

    /// A fire-and-forget message.
    pub fn is_message(&self) -> bool {
        self.request == 0
    }

    /// Serialize this packet to a stream and flush it.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), PacketError> {
        let mut body = Vec::new();
        for record in &self.records {
            let tag = record.data.tag();
            let payload = record.data.flatten()?;
            bytes::put_u32(&mut body, record.id);
            bytes::put_u32(&mut body, region_len(tag.len())?);
            body.extend_from_slice(tag.as_bytes());
            bytes::put_u32(&mut body, region_len(payload.len())?);
            body.extend_from_slice(&payload);
        }

        let mut head = Vec::with_capacity(HEADER_LEN);
        bytes::put_u32(&mut head, self.context.high);
        bytes::put_u32(&mut head, self.context.low);
        bytes::put_i32(&mut head, self.request);
        bytes::put_u32(&mut head, self.target);
        bytes::put_u32(&mut head, region_len(body.len())?);

        writer.write_all(&head)?;
        writer.write_all(&body)?;
        writer.flush()?;
        debug!(
            "tx packet ctx={} target={} request={} records={}",
            self.context,
            self.target,
            self.request,
            self.records.len()
        );
        Ok(())
    }

    /// Read one packet from a stream.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Packet, PacketError> {
        let mut head = [0u8; HEADER_LEN];
        reader.read_exact(&mut head)?;
        let high = bytes::get_u32(&head, 0)?;
        let low = bytes::get_u32(&head, 4)?;
        let request = bytes::get_i32(&head, 8)?;
        let target = bytes::get_u32(&head, 12)?;
        let body_len = bytes::get_u32(&head, 16)? as usize;

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body)?;

        let mut cursor = Cursor::new(&body);
        let mut records = Vec::new();
        while !cursor.is_eof() {
            records.push(read_record(&mut cursor)?);
        }
        debug!(
            "rx packet ctx=({},{}) target={} request={} records={}",
            high,
            low,
            target,
            request,
            records.len()
        );
        Ok(Packet::new(Context::new(high, low), target, request, records))
    }
}

fn read_record(cursor: &mut Cursor<'_>) -> Result<Record, PacketError> {
    let id = cursor.read_u32_be()?;
    let tag_len = cursor.read_u32_be()? as usize;
    let tag = latin1::bytes_to_string(cursor.read_bytes(tag_len)?);
    let ty = Type::parse(&tag)?;
    let payload_len = cursor.read_u32_be()? as usize;
    let payload = cursor.read_bytes(payload_len)?;

    let mut payload_cursor = Cursor::new(payload);
    let data = Data::unflatten_from(&mut payload_cursor, &ty)?;
    if !payload_cursor.is_eof() {
        warn!(
            "record {} payload has {} trailing bytes",
            id,
            payload_cursor.remaining()
        );
        return Err(PacketError::Data(DataError::Wire(WireError::InvalidData {
            reason: format!(
                "record payload length mismatch: {} bytes left of {}",
                payload_cursor.remaining(),
                payload_len
            ),
        })));
    }
    Ok(Record::new(id, data))
}

fn region_len(len: usize) -> Result<u32, PacketError> {
    u32::try_from(len).map_err(|_| {
        PacketError::Data(DataError::Wire(WireError::InvalidData {
            reason: "region longer than u32::MAX".into(),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_record(id: u32, value: i32) -> Record {
        let mut data = Data::from_tag("i").expect("tag should parse");
        data.set_int(value, &[]).expect("set int");
        Record::new(id, data)
    }

    #[test]
    fn test_packet_wire_layout() {
        let packet = Packet::new(Context::new(1, 2), 3, 5, vec![int_record(7, 42)]);
        let mut out = Vec::new();
        packet.write_to(&mut out).expect("write should succeed");

        // Header: high, low, request, target, records length.
        assert_eq!(
            &out[0..20],
            &[
                0, 0, 0, 1, //
                0, 0, 0, 2, //
                0, 0, 0, 5, //
                0, 0, 0, 3, //
                0, 0, 0, 17,
            ]
        );
        // Record: id, tag, payload.
        assert_eq!(
            &out[20..],
            &[
                0, 0, 0, 7, //
                0, 0, 0, 1, b'i', //
                0, 0, 0, 4, 0, 0, 0, 42,
            ]
        );
    }

    #[test]
    fn test_packet_roundtrip() {
        let mut list = Data::from_tag("*s").expect("tag should parse");
        list.set_array_size(2, &[]).expect("set size");
        list.set_string("alpha", &[0]).expect("set");
        list.set_string("beta", &[1]).expect("set");

        let packet = Packet::new(
            Context::new(0, 77),
            11,
            -4,
            vec![int_record(1, -1), Record::new(2, list)],
        );
        let mut wire = Vec::new();
        packet.write_to(&mut wire).expect("write should succeed");

        let decoded = Packet::read_from(&mut wire.as_slice()).expect("read should succeed");
        assert_eq!(decoded, packet);
        assert!(decoded.is_response());
        assert_eq!(decoded.records[1].data.get_string(&[0]).expect("get"), "alpha");
    }

    #[test]
    fn test_record_order_preserved() {
        let packet = Packet::new(
            Context::new(9, 9),
            1,
            0,
            (0..5).map(|i| int_record(i, i as i32 * 10)).collect(),
        );
        let mut wire = Vec::new();
        packet.write_to(&mut wire).expect("write should succeed");
        let decoded = Packet::read_from(&mut wire.as_slice()).expect("read should succeed");
        assert!(decoded.is_message());
        let ids: Vec<u32> = decoded.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_packet() {
        let packet = Packet::new(Context::new(0, 1), 2, 3, Vec::new());
        let mut wire = Vec::new();
        packet.write_to(&mut wire).expect("write should succeed");
        assert_eq!(wire.len(), 20);
        let decoded = Packet::read_from(&mut wire.as_slice()).expect("read should succeed");
        assert!(decoded.records.is_empty());
        assert!(decoded.is_request());
    }

    #[test]
    fn test_truncated_stream_fails() {
        let packet = Packet::new(Context::new(1, 2), 3, 4, vec![int_record(7, 42)]);
        let mut wire = Vec::new();
        packet.write_to(&mut wire).expect("write should succeed");
        wire.truncate(wire.len() - 2);
        let err = Packet::read_from(&mut wire.as_slice()).unwrap_err();
        assert!(matches!(err, PacketError::Io(_)));
    }

    #[test]
    fn test_bad_record_tag_fails() {
        let mut wire = Vec::new();
        // Header advertising a 9-byte records region.
        for word in [1u32, 2, 3, 4, 9] {
            bytes::put_u32(&mut wire, word);
        }
        bytes::put_u32(&mut wire, 7); // record id
        bytes::put_u32(&mut wire, 1); // tag length
        wire.push(b'x'); // not a type tag
        let err = Packet::read_from(&mut wire.as_slice()).unwrap_err();
        assert!(matches!(err, PacketError::Tag(_)));
    }

    #[test]
    fn test_payload_length_mismatch_fails() {
        let mut wire = Vec::new();
        for word in [1u32, 2, 3, 4, 18] {
            bytes::put_u32(&mut wire, word);
        }
        bytes::put_u32(&mut wire, 7); // record id
        bytes::put_u32(&mut wire, 1); // tag length
        wire.push(b'i');
        bytes::put_u32(&mut wire, 5); // payload length: one byte too many
        wire.extend_from_slice(&[0, 0, 0, 42, 0]);
        let err = Packet::read_from(&mut wire.as_slice()).unwrap_err();
        assert!(matches!(err, PacketError::Data(_)));
    }
}
