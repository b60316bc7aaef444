//! HDF5 Link message (message type 0x0006).
//!
//! Root group members are stored as compact hard links. Soft and external
//! links are recognised but cannot be carried into a rewritten file.

use crate::error::FormatError;
use crate::superblock::{ensure_len, read_sized};

const FLAG_CREATION_ORDER: u8 = 0x04;
const FLAG_LINK_TYPE: u8 = 0x08;
const FLAG_CHARSET: u8 = 0x10;

/// A hard link from a group to an object header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMessage {
    /// Link name.
    pub name: String,
    /// Address of the target object header.
    pub address: u64,
}

impl LinkMessage {
    /// Hard link named `name` pointing at `address`.
    pub fn hard(name: &str, address: u64) -> Self {
        Self {
            name: name.to_string(),
            address,
        }
    }

    /// Parse a link message. Only hard links are accepted.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if version != 1 {
            return Err(FormatError::InvalidLinkVersion(version));
        }
        let flags = data[1];
        let mut pos = 2usize;

        let link_type = if flags & FLAG_LINK_TYPE != 0 {
            ensure_len(data, pos, 1)?;
            pos += 1;
            data[pos - 1]
        } else {
            0
        };
        if flags & FLAG_CREATION_ORDER != 0 {
            pos += 8;
        }
        if flags & FLAG_CHARSET != 0 {
            pos += 1;
        }

        let len_width = 1u8 << (flags & 0x03);
        let name_len = read_sized(data, pos, len_width)? as usize;
        pos += len_width as usize;
        ensure_len(data, pos, name_len)?;
        let name = String::from_utf8_lossy(&data[pos..pos + name_len]).into_owned();
        pos += name_len;

        match link_type {
            0 => Ok(LinkMessage {
                name,
                address: read_sized(data, pos, offset_size)?,
            }),
            1 => Err(FormatError::Unsupported(format!("soft link \"{name}\""))),
            64 => Err(FormatError::Unsupported(format!("external link \"{name}\""))),
            other => Err(FormatError::Unsupported(format!(
                "link type {other} for \"{name}\""
            ))),
        }
    }

    /// Serialize as a version 1 hard link with an 8-byte address.
    pub fn serialize(&self) -> Vec<u8> {
        let name = self.name.as_bytes();
        let mut buf = Vec::with_capacity(4 + name.len() + 8);
        buf.push(1);
        if name.len() <= u8::MAX as usize {
            buf.push(0x00);
            buf.push(name.len() as u8);
        } else {
            buf.push(0x01);
            buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        }
        buf.extend_from_slice(name);
        buf.extend_from_slice(&self.address.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_link_roundtrip() {
        let link = LinkMessage::hard("temperature", 0x1234);
        assert_eq!(LinkMessage::parse(&link.serialize(), 8).unwrap(), link);
    }

    #[test]
    fn long_name_uses_two_byte_length() {
        let name = "x".repeat(300);
        let bytes = LinkMessage::hard(&name, 99).serialize();
        assert_eq!(bytes[1] & 0x03, 0x01);
        assert_eq!(LinkMessage::parse(&bytes, 8).unwrap().name, name);
    }

    #[test]
    fn soft_link_unsupported() {
        let mut buf = vec![1, FLAG_LINK_TYPE, 1, 3];
        buf.extend_from_slice(b"abc");
        buf.extend_from_slice(&[2, 0]);
        buf.extend_from_slice(b"/x");
        assert!(matches!(
            LinkMessage::parse(&buf, 8),
            Err(FormatError::Unsupported(_))
        ));
    }

    #[test]
    fn creation_order_field_skipped() {
        let mut buf = vec![1, FLAG_CREATION_ORDER];
        buf.extend_from_slice(&7u64.to_le_bytes());
        buf.push(2);
        buf.extend_from_slice(b"ab");
        buf.extend_from_slice(&500u64.to_le_bytes());
        let link = LinkMessage::parse(&buf, 8).unwrap();
        assert_eq!(link.name, "ab");
        assert_eq!(link.address, 500);
    }

    #[test]
    fn bad_version() {
        assert_eq!(
            LinkMessage::parse(&[2, 0, 0], 8),
            Err(FormatError::InvalidLinkVersion(2))
        );
    }
}
