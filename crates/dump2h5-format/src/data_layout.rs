//! HDF5 Data Layout message (message type 0x0008).

use byteorder::{ByteOrder as _, LittleEndian};

use crate::error::FormatError;
use crate::superblock::{ensure_len, is_undefined, read_sized, UNDEFINED_ADDRESS};

/// Where a dataset's elements live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayout {
    /// Elements stored inside the layout message itself.
    Compact { data: Vec<u8> },
    /// One contiguous block. `address` is `None` while storage is unallocated.
    Contiguous { address: Option<u64>, size: u64 },
}

impl DataLayout {
    /// Parse a version 3 or 4 layout message. Chunked and virtual storage
    /// are reported as unsupported.
    pub fn parse(data: &[u8], offset_size: u8, length_size: u8) -> Result<DataLayout, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        if !matches!(version, 3 | 4) {
            return Err(FormatError::InvalidLayoutVersion(version));
        }
        match data[1] {
            0 => {
                ensure_len(data, 2, 2)?;
                let size = LittleEndian::read_u16(&data[2..4]) as usize;
                ensure_len(data, 4, size)?;
                Ok(DataLayout::Compact {
                    data: data[4..4 + size].to_vec(),
                })
            }
            1 => {
                let address = if is_undefined(data, 2, offset_size) {
                    None
                } else {
                    Some(read_sized(data, 2, offset_size)?)
                };
                let size = read_sized(data, 2 + offset_size as usize, length_size)?;
                Ok(DataLayout::Contiguous { address, size })
            }
            2 => Err(FormatError::Unsupported("chunked dataset storage".into())),
            3 => Err(FormatError::Unsupported("virtual dataset storage".into())),
            other => Err(FormatError::InvalidLayoutClass(other)),
        }
    }

    /// Serialize as a version 3 layout message with 8-byte addresses.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            DataLayout::Compact { data } => {
                let mut buf = Vec::with_capacity(4 + data.len());
                buf.extend_from_slice(&[3, 0]);
                buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
                buf.extend_from_slice(data);
                buf
            }
            DataLayout::Contiguous { address, size } => {
                let mut buf = Vec::with_capacity(18);
                buf.extend_from_slice(&[3, 1]);
                buf.extend_from_slice(&address.unwrap_or(UNDEFINED_ADDRESS).to_le_bytes());
                buf.extend_from_slice(&size.to_le_bytes());
                buf
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_roundtrip() {
        let layout = DataLayout::Contiguous {
            address: Some(4096),
            size: 320,
        };
        let bytes = layout.serialize();
        assert_eq!(bytes.len(), 18);
        assert_eq!(DataLayout::parse(&bytes, 8, 8).unwrap(), layout);
    }

    #[test]
    fn unallocated_contiguous() {
        let layout = DataLayout::Contiguous {
            address: None,
            size: 0,
        };
        assert_eq!(DataLayout::parse(&layout.serialize(), 8, 8).unwrap(), layout);
    }

    #[test]
    fn compact_roundtrip() {
        let layout = DataLayout::Compact {
            data: vec![1, 2, 3, 4],
        };
        assert_eq!(DataLayout::parse(&layout.serialize(), 8, 8).unwrap(), layout);
    }

    #[test]
    fn chunked_unsupported() {
        assert!(matches!(
            DataLayout::parse(&[3, 2, 1], 8, 8),
            Err(FormatError::Unsupported(_))
        ));
    }

    #[test]
    fn old_versions_rejected() {
        assert_eq!(
            DataLayout::parse(&[1, 0], 8, 8),
            Err(FormatError::InvalidLayoutVersion(1))
        );
    }
}
