//! HDF5 object header parsing, versions 1 and 2.
//!
//! Messages from either version come out in the same shape, so a dataset
//! read from a version 1 header can be re-encoded as version 2.

use std::collections::HashSet;

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::superblock::{ensure_len, read_sized};

/// OHDR signature for v2 object headers.
pub(crate) const OHDR_SIGNATURE: [u8; 4] = *b"OHDR";

/// OCHK signature for v2 continuation chunks.
const OCHK_SIGNATURE: [u8; 4] = *b"OCHK";

/// Flag bit: attribute creation order tracked, messages carry a 2-byte order.
const FLAG_CREATION_ORDER: u8 = 0x04;
/// Flag bit: non-default attribute phase change values stored.
const FLAG_PHASE_CHANGE: u8 = 0x10;
/// Flag bit: access/modification/change/birth times stored.
const FLAG_TIMES: u8 = 0x20;

/// Message flag bit 3: fail if the message type is unknown.
const MSG_FAIL_IF_UNKNOWN: u8 = 0x08;

/// A single header message, kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMessage {
    /// The message type.
    pub msg_type: MessageType,
    /// Message flags byte.
    pub flags: u8,
    /// Raw message data bytes.
    pub data: Vec<u8>,
}

impl HeaderMessage {
    /// Bit 1 of the message flags: the message is stored in the shared heap.
    pub fn is_shared(&self) -> bool {
        self.flags & 0x02 != 0
    }
}

/// Parsed object header.
#[derive(Debug, Clone)]
pub struct ObjectHeader {
    /// Header version (1 or 2).
    pub version: u8,
    /// Object header flags (v2 only, zero for v1).
    pub flags: u8,
    /// All non-NIL, non-continuation messages from every chunk.
    pub messages: Vec<HeaderMessage>,
}

/// Continuation blocks still to visit, each visited once.
#[derive(Default)]
struct Continuations {
    pending: Vec<(usize, usize)>,
    seen: HashSet<usize>,
}

impl Continuations {
    fn push(&mut self, body: &[u8], offset_size: u8, length_size: u8) -> Result<(), FormatError> {
        let offset = read_sized(body, 0, offset_size)?;
        let length = read_sized(body, offset_size as usize, length_size)?;
        let offset = usize::try_from(offset).map_err(|_| eof_at(offset))?;
        let length = usize::try_from(length).map_err(|_| eof_at(length))?;
        if !self.seen.insert(offset) {
            return Err(FormatError::CyclicStructure(offset as u64));
        }
        self.pending.push((offset, length));
        Ok(())
    }

    fn pop(&mut self) -> Option<(usize, usize)> {
        self.pending.pop()
    }
}

fn eof_at(value: u64) -> FormatError {
    FormatError::UnexpectedEof {
        expected: usize::try_from(value).unwrap_or(usize::MAX),
        available: 0,
    }
}

impl ObjectHeader {
    /// Parse the object header at `offset`. Version 2 headers start with
    /// `OHDR`; anything else must be a version 1 header.
    pub fn parse(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 4)?;
        if data[offset..offset + 4] == OHDR_SIGNATURE {
            Self::parse_v2(data, offset, offset_size, length_size)
        } else {
            Self::parse_v1(data, offset, offset_size, length_size)
        }
    }

    fn parse_v1(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        // version, reserved, message count, reference count, header size,
        // then padding to 16 bytes.
        ensure_len(data, offset, 16)?;
        let version = data[offset];
        if version != 1 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let header_size = LittleEndian::read_u32(&data[offset + 8..offset + 12]) as usize;
        let start = offset + 16;
        ensure_len(data, start, header_size)?;

        let mut messages = Vec::new();
        let mut continuations = Continuations::default();
        parse_v1_messages(
            data,
            start,
            start + header_size,
            (offset_size, length_size),
            &mut messages,
            &mut continuations,
        )?;
        while let Some((cont_offset, cont_length)) = continuations.pop() {
            ensure_len(data, cont_offset, cont_length)?;
            parse_v1_messages(
                data,
                cont_offset,
                cont_offset + cont_length,
                (offset_size, length_size),
                &mut messages,
                &mut continuations,
            )?;
        }

        Ok(ObjectHeader {
            version: 1,
            flags: 0,
            messages,
        })
    }

    fn parse_v2(
        data: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        ensure_len(data, offset, 6)?;
        let version = data[offset + 4];
        if version != 2 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let flags = data[offset + 5];

        let mut pos = offset + 6;
        if flags & FLAG_TIMES != 0 {
            pos += 16;
        }
        if flags & FLAG_PHASE_CHANGE != 0 {
            pos += 4;
        }

        let width = 1u8 << (flags & 0x03);
        let chunk0_size = read_sized(data, pos, width)?;
        pos += width as usize;

        let chunk0_size = usize::try_from(chunk0_size).map_err(|_| eof_at(chunk0_size))?;
        ensure_len(data, pos, chunk0_size)?;
        let chunk0_end = pos + chunk0_size;
        verify_checksum(data, offset, chunk0_end)?;

        let has_order = flags & FLAG_CREATION_ORDER != 0;
        let mut messages = Vec::new();
        let mut continuations = Continuations::default();
        parse_v2_messages(
            data,
            pos,
            chunk0_end,
            has_order,
            (offset_size, length_size),
            &mut messages,
            &mut continuations,
        )?;

        while let Some((cont_offset, cont_length)) = continuations.pop() {
            ensure_len(data, cont_offset, cont_length)?;
            if cont_length < 8 || data[cont_offset..cont_offset + 4] != OCHK_SIGNATURE {
                return Err(FormatError::InvalidObjectHeaderSignature);
            }
            let checksum_pos = cont_offset + cont_length - 4;
            verify_checksum(data, cont_offset, checksum_pos)?;
            parse_v2_messages(
                data,
                cont_offset + 4,
                checksum_pos,
                has_order,
                (offset_size, length_size),
                &mut messages,
                &mut continuations,
            )?;
        }

        Ok(ObjectHeader {
            version: 2,
            flags,
            messages,
        })
    }

    /// First message of the given type.
    pub fn find(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// All messages of the given type, in header order.
    pub fn find_all(&self, msg_type: MessageType) -> impl Iterator<Item = &HeaderMessage> {
        self.messages.iter().filter(move |m| m.msg_type == msg_type)
    }
}

fn verify_checksum(data: &[u8], start: usize, checksum_pos: usize) -> Result<(), FormatError> {
    ensure_len(data, checksum_pos, 4)?;
    let stored = LittleEndian::read_u32(&data[checksum_pos..checksum_pos + 4]);
    let computed = jenkins_lookup3(&data[start..checksum_pos]);
    if stored != computed {
        return Err(FormatError::ChecksumMismatch {
            expected: stored,
            computed,
        });
    }
    Ok(())
}

/// Record one message, or queue the block a continuation points at.
fn collect(
    msg_type: MessageType,
    flags: u8,
    body: &[u8],
    (offset_size, length_size): (u8, u8),
    messages: &mut Vec<HeaderMessage>,
    continuations: &mut Continuations,
) -> Result<(), FormatError> {
    if let MessageType::Unknown(id) = msg_type {
        if flags & MSG_FAIL_IF_UNKNOWN != 0 {
            return Err(FormatError::UnsupportedMessage(id));
        }
    }
    match msg_type {
        MessageType::Nil => {}
        MessageType::ObjectHeaderContinuation => {
            continuations.push(body, offset_size, length_size)?;
        }
        _ => messages.push(HeaderMessage {
            msg_type,
            flags,
            data: body.to_vec(),
        }),
    }
    Ok(())
}

/// `end` must already be known to lie within `data`.
fn parse_v1_messages(
    data: &[u8],
    start: usize,
    end: usize,
    sizes: (u8, u8),
    messages: &mut Vec<HeaderMessage>,
    continuations: &mut Continuations,
) -> Result<(), FormatError> {
    let mut pos = start;
    while pos + 8 <= end {
        let raw_type = LittleEndian::read_u16(&data[pos..pos + 2]);
        let size = LittleEndian::read_u16(&data[pos + 2..pos + 4]) as usize;
        let flags = data[pos + 4];
        pos += 8;
        if pos + size > end {
            break;
        }
        collect(
            MessageType::from_u16(raw_type),
            flags,
            &data[pos..pos + size],
            sizes,
            messages,
            continuations,
        )?;
        pos += size;
    }
    Ok(())
}

/// `end` must already be known to lie within `data`.
fn parse_v2_messages(
    data: &[u8],
    start: usize,
    end: usize,
    has_order: bool,
    sizes: (u8, u8),
    messages: &mut Vec<HeaderMessage>,
    continuations: &mut Continuations,
) -> Result<(), FormatError> {
    let header_len = if has_order { 6 } else { 4 };
    let mut pos = start;

    while pos + header_len <= end {
        let raw_type = data[pos] as u16;
        let size = LittleEndian::read_u16(&data[pos + 1..pos + 3]) as usize;
        let flags = data[pos + 3];
        pos += header_len;

        // Trailing gap smaller than a message.
        if pos + size > end {
            break;
        }
        collect(
            MessageType::from_u16(raw_type),
            flags,
            &data[pos..pos + size],
            sizes,
            messages,
            continuations,
        )?;
        pos += size;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_header_writer::ObjectHeaderWriter;

    /// Version 1 header holding `messages` as (type, data, flags).
    fn build_v1_header(messages: &[(u16, &[u8], u8)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (msg_type, data, flags) in messages {
            body.extend_from_slice(&msg_type.to_le_bytes());
            body.extend_from_slice(&(data.len() as u16).to_le_bytes());
            body.push(*flags);
            body.extend_from_slice(&[0; 3]);
            body.extend_from_slice(data);
        }
        let mut buf = vec![1, 0];
        buf.extend_from_slice(&(messages.len() as u16).to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(&body);
        buf
    }

    #[test]
    fn parse_v1_two_messages() {
        let bytes = build_v1_header(&[
            (0x0001, &[1, 1, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0], 0),
            (0x0003, &[0x11, 0x20, 0x1f, 0, 4, 0, 0, 0], 1),
        ]);
        let hdr = ObjectHeader::parse(&bytes, 0, 8, 8).unwrap();
        assert_eq!(hdr.version, 1);
        assert_eq!(hdr.messages.len(), 2);
        assert_eq!(hdr.messages[0].msg_type, MessageType::Dataspace);
        assert_eq!(hdr.messages[1].flags, 1);
        assert_eq!(hdr.messages[1].data.len(), 8);
    }

    #[test]
    fn parse_v1_follows_continuation() {
        let tail = build_v1_header(&[(0x000C, &[7; 8], 0)]);
        // Continuation block: the tail's messages without its 16-byte prefix.
        let mut cont = Vec::new();
        cont.extend_from_slice(&64u64.to_le_bytes());
        cont.extend_from_slice(&((tail.len() - 16) as u64).to_le_bytes());
        let mut bytes = build_v1_header(&[(0x0010, &cont, 0)]);
        bytes.resize(64, 0);
        bytes.extend_from_slice(&tail[16..]);

        let hdr = ObjectHeader::parse(&bytes, 0, 8, 8).unwrap();
        assert_eq!(hdr.messages.len(), 1);
        assert_eq!(hdr.find(MessageType::Attribute).unwrap().data, vec![7; 8]);
    }

    #[test]
    fn parse_v1_self_continuation_is_cyclic() {
        let mut cont = Vec::new();
        cont.extend_from_slice(&16u64.to_le_bytes());
        cont.extend_from_slice(&24u64.to_le_bytes());
        let bytes = build_v1_header(&[(0x0010, &cont, 0)]);
        assert_eq!(
            ObjectHeader::parse(&bytes, 0, 8, 8).unwrap_err(),
            FormatError::CyclicStructure(16)
        );
    }

    #[test]
    fn bad_version_rejected() {
        let mut data = vec![0u8; 32];
        data[0] = 3;
        assert_eq!(
            ObjectHeader::parse(&data, 0, 8, 8).unwrap_err(),
            FormatError::InvalidObjectHeaderVersion(3)
        );
    }

    #[test]
    fn checksum_is_verified() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Dataspace, vec![2, 1, 0, 1, 4, 0, 0, 0, 0, 0, 0, 0]);
        let mut bytes = w.serialize().unwrap();
        bytes[10] ^= 0x01;
        assert!(matches!(
            ObjectHeader::parse(&bytes, 0, 8, 8),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn huge_chunk_size_is_eof() {
        let w = ObjectHeaderWriter::new();
        let mut bytes = w.serialize().unwrap();
        // 8-byte chunk size field holding u64::MAX.
        bytes[5] = 0x03;
        bytes.truncate(6);
        bytes.extend_from_slice(&[0xFF; 8]);
        bytes.extend_from_slice(&[0; 8]);
        assert!(matches!(
            ObjectHeader::parse(&bytes, 0, 8, 8),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn huge_continuation_is_eof() {
        let mut cont = Vec::new();
        cont.extend_from_slice(&u64::MAX.to_le_bytes());
        cont.extend_from_slice(&u64::MAX.to_le_bytes());
        let bytes = build_v1_header(&[(0x0010, &cont, 0)]);
        assert!(matches!(
            ObjectHeader::parse(&bytes, 0, 8, 8),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn header_at_nonzero_offset() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message(MessageType::Attribute, vec![9; 5]);
        let mut data = vec![0u8; 17];
        data.extend_from_slice(&w.serialize().unwrap());
        let hdr = ObjectHeader::parse(&data, 17, 8, 8).unwrap();
        assert_eq!(hdr.version, 2);
        assert_eq!(hdr.messages.len(), 1);
        assert_eq!(hdr.find(MessageType::Attribute).unwrap().data, vec![9; 5]);
    }

    #[test]
    fn unknown_must_understand_message_rejected() {
        let mut w = ObjectHeaderWriter::new();
        w.add_message_with_flags(MessageType::Unknown(0x30), vec![0; 4], 0x08);
        let bytes = w.serialize().unwrap();
        assert_eq!(
            ObjectHeader::parse(&bytes, 0, 8, 8).unwrap_err(),
            FormatError::UnsupportedMessage(0x30)
        );
        let v1 = build_v1_header(&[(0x0130, &[0; 8], 0x08)]);
        assert_eq!(
            ObjectHeader::parse(&v1, 0, 8, 8).unwrap_err(),
            FormatError::UnsupportedMessage(0x0130)
        );
    }
}
