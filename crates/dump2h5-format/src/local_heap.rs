//! Local heaps holding the link names of symbol-table groups.

use crate::error::FormatError;
use crate::superblock::{ensure_len, read_sized};

const HEAP_SIGNATURE: [u8; 4] = *b"HEAP";

/// Parsed local heap header.
#[derive(Debug, Clone)]
pub struct LocalHeap {
    /// Size of the data segment in bytes.
    pub data_segment_size: u64,
    /// File address of the data segment.
    pub data_segment_address: u64,
}

impl LocalHeap {
    pub fn parse(
        file: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<LocalHeap, FormatError> {
        let (os, ls) = (offset_size as usize, length_size as usize);
        ensure_len(file, offset, 8 + 2 * ls + os)?;
        if file[offset..offset + 4] != HEAP_SIGNATURE {
            return Err(FormatError::InvalidLocalHeapSignature);
        }
        let version = file[offset + 4];
        if version != 0 {
            return Err(FormatError::InvalidLocalHeapVersion(version));
        }
        let data_segment_size = read_sized(file, offset + 8, length_size)?;
        // Free list head at offset + 8 + ls is not needed for reading.
        let data_segment_address = read_sized(file, offset + 8 + 2 * ls, offset_size)?;
        Ok(LocalHeap {
            data_segment_size,
            data_segment_address,
        })
    }

    /// The null-terminated string at `string_offset` in the data segment.
    pub fn read_string(&self, file: &[u8], string_offset: u64) -> Result<String, FormatError> {
        let segment = usize::try_from(self.data_segment_address)
            .ok()
            .zip(usize::try_from(self.data_segment_size).ok())
            .and_then(|(start, len)| file.get(start..start.checked_add(len)?))
            .ok_or(FormatError::UnexpectedEof {
                expected: usize::MAX,
                available: file.len(),
            })?;
        let tail = usize::try_from(string_offset)
            .ok()
            .and_then(|off| segment.get(off..))
            .filter(|t| !t.is_empty())
            .ok_or(FormatError::UnexpectedEof {
                expected: usize::MAX,
                available: segment.len(),
            })?;
        let len = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(FormatError::UnexpectedEof {
                expected: tail.len() + 1,
                available: tail.len(),
            })?;
        std::str::from_utf8(&tail[..len])
            .map(str::to_owned)
            .map_err(|_| FormatError::Unsupported("link name is not UTF-8".into()))
    }
}
