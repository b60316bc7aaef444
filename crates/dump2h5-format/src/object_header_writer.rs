//! Object header writer for the v2 format.

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::object_header::{HeaderMessage, OHDR_SIGNATURE};

/// Writer for v2 object headers with checksums.
///
/// Everything goes into a single chunk; no continuation blocks are emitted.
#[derive(Debug, Default)]
pub struct ObjectHeaderWriter {
    messages: Vec<HeaderMessage>,
}

impl ObjectHeaderWriter {
    /// Create a new empty object header writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the header with default flags (0).
    pub fn add_message(&mut self, msg_type: MessageType, data: Vec<u8>) {
        self.add_message_with_flags(msg_type, data, 0);
    }

    /// Add a message with specific flags.
    pub fn add_message_with_flags(&mut self, msg_type: MessageType, data: Vec<u8>, flags: u8) {
        self.messages.push(HeaderMessage {
            msg_type,
            flags,
            data,
        });
    }

    /// Add an already-encoded message carried over from another header.
    pub fn add_raw(&mut self, message: HeaderMessage) {
        self.messages.push(message);
    }

    /// Serialize the complete header (OHDR prefix, messages, checksum).
    pub fn serialize(&self) -> Result<Vec<u8>, FormatError> {
        let mut body_len = 0usize;
        for m in &self.messages {
            if m.data.len() > u16::MAX as usize {
                return Err(FormatError::MessageTooLarge(m.data.len()));
            }
            // Version 1 headers allow 16-bit type ids; version 2 has one byte.
            let id = m.msg_type.to_u16();
            if id > u8::MAX as u16 {
                return Err(FormatError::UnsupportedMessage(id));
            }
            body_len += 4 + m.data.len();
        }

        let (size_flags, width) = if body_len <= u8::MAX as usize {
            (0x00u8, 1usize)
        } else if body_len <= u16::MAX as usize {
            (0x01, 2)
        } else {
            (0x02, 4)
        };

        let mut buf = Vec::with_capacity(6 + width + body_len + 4);
        buf.extend_from_slice(&OHDR_SIGNATURE);
        buf.push(2);
        buf.push(size_flags);
        buf.extend_from_slice(&(body_len as u32).to_le_bytes()[..width]);

        for m in &self.messages {
            buf.push(m.msg_type.to_u16() as u8);
            buf.extend_from_slice(&(m.data.len() as u16).to_le_bytes());
            buf.push(m.flags);
            buf.extend_from_slice(&m.data);
        }

        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        Ok(buf)
    }
}
