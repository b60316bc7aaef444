//! HDF5 superblock, versions 0 through 3.
//!
//! Containers are always written with a version 3 superblock and 8-byte
//! offsets and lengths. Versions 0 and 1, the libhdf5 default, are read so
//! that files whose root group is a symbol table can be carried into a
//! rewritten container.

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::jenkins_lookup3;
use crate::error::FormatError;
use crate::signature::HDF5_SIGNATURE;

/// Size in bytes of a serialized v2/v3 superblock with 8-byte offsets.
pub const SUPERBLOCK_V3_SIZE: usize = 48;

/// The "undefined address" value.
pub const UNDEFINED_ADDRESS: u64 = u64::MAX;

/// Parsed superblock (all versions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Superblock version (0-3).
    pub version: u8,
    /// Size of offsets in bytes (2, 4, or 8).
    pub offset_size: u8,
    /// Size of lengths in bytes (2, 4, or 8).
    pub length_size: u8,
    /// File consistency flags.
    pub consistency_flags: u8,
    /// File base address.
    pub base_address: u64,
    /// Superblock extension object header address (v2/v3), usually undefined.
    pub extension_address: u64,
    /// Driver information block address (v0/v1), usually undefined.
    pub driver_info_address: u64,
    /// End-of-file address.
    pub eof_address: u64,
    /// Root group object header address.
    pub root_group_address: u64,
}

pub(crate) fn read_sized(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    let s = size as usize;
    ensure_len(data, pos, s)?;
    let slice = &data[pos..pos + s];
    Ok(match size {
        1 => slice[0] as u64,
        2 => LittleEndian::read_u16(slice) as u64,
        4 => LittleEndian::read_u32(slice) as u64,
        8 => LittleEndian::read_u64(slice),
        _ => return Err(FormatError::InvalidOffsetSize(size)),
    })
}

/// Fails unless `needed` bytes are available at `pos`. Sizes read from a
/// file may be arbitrary, so the end is computed without overflow.
pub(crate) fn ensure_len(data: &[u8], pos: usize, needed: usize) -> Result<(), FormatError> {
    match pos.checked_add(needed) {
        Some(end) if end <= data.len() => Ok(()),
        end => Err(FormatError::UnexpectedEof {
            expected: end.unwrap_or(usize::MAX),
            available: data.len(),
        }),
    }
}

/// True if the `size` bytes at `pos` are all 0xFF.
pub(crate) fn is_undefined(data: &[u8], pos: usize, size: u8) -> bool {
    pos.checked_add(size as usize)
        .and_then(|end| data.get(pos..end))
        .is_some_and(|s| s.iter().all(|&b| b == 0xFF))
}

/// Like [`read_sized`], with all-ones mapped to [`UNDEFINED_ADDRESS`]
/// whatever the width.
pub(crate) fn read_address(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    let value = read_sized(data, pos, size)?;
    Ok(if is_undefined(data, pos, size) {
        UNDEFINED_ADDRESS
    } else {
        value
    })
}

fn validate_sizes(offset_size: u8, length_size: u8) -> Result<(), FormatError> {
    if !matches!(offset_size, 2 | 4 | 8) {
        return Err(FormatError::InvalidOffsetSize(offset_size));
    }
    if !matches!(length_size, 2 | 4 | 8) {
        return Err(FormatError::InvalidLengthSize(length_size));
    }
    Ok(())
}

impl Superblock {
    /// A fresh v3 superblock for a file of `eof_address` bytes.
    pub fn new_v3(root_group_address: u64, eof_address: u64) -> Self {
        Self {
            version: 3,
            offset_size: 8,
            length_size: 8,
            consistency_flags: 0,
            base_address: 0,
            extension_address: UNDEFINED_ADDRESS,
            driver_info_address: UNDEFINED_ADDRESS,
            eof_address,
            root_group_address,
        }
    }

    /// Parse a superblock from `data` starting at `signature_offset`.
    pub fn parse(data: &[u8], signature_offset: usize) -> Result<Superblock, FormatError> {
        let d = data
            .get(signature_offset..)
            .ok_or(FormatError::SignatureNotFound)?;
        ensure_len(d, 0, 9)?;
        if d[..8] != HDF5_SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }

        match d[8] {
            0 => Self::parse_v0v1(d, 0),
            1 => Self::parse_v0v1(d, 1),
            2 | 3 => Self::parse_v2v3(d, d[8]),
            v => Err(FormatError::UnsupportedVersion(v)),
        }
    }

    /// Versions 0 and 1 differ only by the indexed storage K (and its
    /// padding) that version 1 inserts before the consistency flags.
    fn parse_v0v1(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        let fixed = if version == 0 { 24 } else { 28 };
        ensure_len(d, 0, fixed)?;

        let offset_size = d[13];
        let length_size = d[14];
        validate_sizes(offset_size, length_size)?;
        let consistency_flags = LittleEndian::read_u32(&d[fixed - 4..fixed]);

        // Four addresses, then the root symbol table entry: link name
        // offset, object header address, cache type, reserved, scratch pad.
        let os = offset_size as usize;
        ensure_len(d, fixed, 4 * os + 2 * os + 24)?;
        let pos = fixed;

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            consistency_flags: consistency_flags as u8,
            base_address: read_sized(d, pos, offset_size)?,
            extension_address: UNDEFINED_ADDRESS,
            eof_address: read_sized(d, pos + 2 * os, offset_size)?,
            driver_info_address: read_address(d, pos + 3 * os, offset_size)?,
            root_group_address: read_sized(d, pos + 5 * os, offset_size)?,
        })
    }

    fn parse_v2v3(d: &[u8], version: u8) -> Result<Superblock, FormatError> {
        ensure_len(d, 0, 12)?;
        let offset_size = d[9];
        let length_size = d[10];
        validate_sizes(offset_size, length_size)?;
        let consistency_flags = d[11];

        let os = offset_size as usize;
        let checksum_pos = 12 + 4 * os;
        ensure_len(d, checksum_pos, 4)?;

        let stored = LittleEndian::read_u32(&d[checksum_pos..checksum_pos + 4]);
        let computed = jenkins_lookup3(&d[..checksum_pos]);
        if stored != computed {
            return Err(FormatError::ChecksumMismatch {
                expected: stored,
                computed,
            });
        }

        Ok(Superblock {
            version,
            offset_size,
            length_size,
            consistency_flags,
            base_address: read_sized(d, 12, offset_size)?,
            extension_address: read_address(d, 12 + os, offset_size)?,
            driver_info_address: UNDEFINED_ADDRESS,
            eof_address: read_sized(d, 12 + 2 * os, offset_size)?,
            root_group_address: read_sized(d, 12 + 3 * os, offset_size)?,
        })
    }

    /// Serialize as a v3 superblock with 8-byte offsets.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SUPERBLOCK_V3_SIZE);
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.push(3);
        buf.push(8);
        buf.push(8);
        buf.push(self.consistency_flags);
        buf.extend_from_slice(&self.base_address.to_le_bytes());
        buf.extend_from_slice(&self.extension_address.to_le_bytes());
        buf.extend_from_slice(&self.eof_address.to_le_bytes());
        buf.extend_from_slice(&self.root_group_address.to_le_bytes());
        let checksum = jenkins_lookup3(&buf);
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_offset(buf: &mut Vec<u8>, val: u64, size: u8) {
        match size {
            4 => buf.extend_from_slice(&(val as u32).to_le_bytes()),
            8 => buf.extend_from_slice(&val.to_le_bytes()),
            _ => panic!("bad test offset size"),
        }
    }

    /// Version 0 superblock with the root group header at 96.
    fn build_v0_bytes(offset_size: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.extend_from_slice(&[0, 0, 0, 0, 0, offset_size, offset_size, 0]);
        buf.extend_from_slice(&4u16.to_le_bytes()); // group leaf K
        buf.extend_from_slice(&16u16.to_le_bytes()); // group internal K
        buf.extend_from_slice(&0u32.to_le_bytes()); // consistency flags
        write_offset(&mut buf, 0, offset_size); // base
        write_offset(&mut buf, u64::MAX, offset_size); // free space
        write_offset(&mut buf, 4096, offset_size); // eof
        write_offset(&mut buf, u64::MAX, offset_size); // driver info
        write_offset(&mut buf, 0, offset_size); // root link name offset
        write_offset(&mut buf, 96, offset_size); // root object header
        buf.extend_from_slice(&[0u8; 24]); // cache type, reserved, scratch
        buf
    }

    #[test]
    fn v3_roundtrip() {
        let sb = Superblock::new_v3(48, 1024);
        let bytes = sb.serialize();
        assert_eq!(bytes.len(), SUPERBLOCK_V3_SIZE);
        let parsed = Superblock::parse(&bytes, 0).unwrap();
        assert_eq!(parsed, sb);
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let mut bytes = Superblock::new_v3(48, 1024).serialize();
        bytes[30] ^= 0xFF;
        assert!(matches!(
            Superblock::parse(&bytes, 0),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn parse_v0_8byte_offsets() {
        let sb = Superblock::parse(&build_v0_bytes(8), 0).unwrap();
        assert_eq!(sb.version, 0);
        assert_eq!(sb.offset_size, 8);
        assert_eq!(sb.base_address, 0);
        assert_eq!(sb.eof_address, 4096);
        assert_eq!(sb.root_group_address, 96);
        assert_eq!(sb.driver_info_address, UNDEFINED_ADDRESS);
        assert_eq!(sb.extension_address, UNDEFINED_ADDRESS);
    }

    #[test]
    fn parse_v0_4byte_offsets() {
        let sb = Superblock::parse(&build_v0_bytes(4), 0).unwrap();
        assert_eq!(sb.offset_size, 4);
        assert_eq!(sb.root_group_address, 96);
        assert_eq!(sb.driver_info_address, UNDEFINED_ADDRESS);
    }

    #[test]
    fn parse_v1_shifts_addresses() {
        let v0 = build_v0_bytes(8);
        let mut v1 = v0[..20].to_vec();
        v1[8] = 1;
        v1.extend_from_slice(&32u16.to_le_bytes()); // indexed storage K
        v1.extend_from_slice(&[0, 0]);
        v1.extend_from_slice(&v0[20..]);
        let sb = Superblock::parse(&v1, 0).unwrap();
        assert_eq!(sb.version, 1);
        assert_eq!(sb.eof_address, 4096);
        assert_eq!(sb.root_group_address, 96);
    }

    #[test]
    fn truncated_v0() {
        let bytes = build_v0_bytes(8);
        assert!(matches!(
            Superblock::parse(&bytes[..40], 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut bytes = Superblock::new_v3(48, 1024).serialize();
        bytes[8] = 4;
        assert_eq!(
            Superblock::parse(&bytes, 0),
            Err(FormatError::UnsupportedVersion(4))
        );
    }

    #[test]
    fn truncated_superblock() {
        let bytes = Superblock::new_v3(48, 1024).serialize();
        assert!(matches!(
            Superblock::parse(&bytes[..20], 0),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn length_overflow_is_eof() {
        assert!(matches!(
            ensure_len(&[0u8; 8], usize::MAX - 2, 8),
            Err(FormatError::UnexpectedEof { expected: usize::MAX, available: 8 })
        ));
        assert!(!is_undefined(&[0xFF; 4], usize::MAX, 8));
    }
}
