//! Symbol-table groups: the group layout of files with version 0 and 1
//! superblocks.
//!
//! A group's symbol table message names a B-tree whose leaves point at
//! symbol nodes (`SNOD`), and a local heap holding the link names.

use crate::btree_v1::collect_symbol_nodes;
use crate::error::FormatError;
use crate::local_heap::LocalHeap;
use crate::superblock::{ensure_len, read_address, read_sized, UNDEFINED_ADDRESS};

const SNOD_SIGNATURE: [u8; 4] = *b"SNOD";

/// Cache type of entries that are soft links.
const CACHE_SOFT_LINK: u32 = 2;

/// Symbol table message (type 0x0011).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableMessage {
    pub btree_address: u64,
    pub local_heap_address: u64,
}

impl SymbolTableMessage {
    pub fn parse(data: &[u8], offset_size: u8) -> Result<SymbolTableMessage, FormatError> {
        Ok(SymbolTableMessage {
            btree_address: read_sized(data, 0, offset_size)?,
            local_heap_address: read_sized(data, offset_size as usize, offset_size)?,
        })
    }
}

/// One entry of a symbol node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Offset of the link name in the group's local heap.
    pub name_offset: u64,
    pub object_header_address: u64,
    pub cache_type: u32,
}

/// A parsed symbol node.
#[derive(Debug, Clone)]
pub struct SymbolTableNode {
    pub entries: Vec<SymbolEntry>,
}

impl SymbolTableNode {
    pub fn parse(file: &[u8], offset: usize, offset_size: u8) -> Result<SymbolTableNode, FormatError> {
        ensure_len(file, offset, 8)?;
        if file[offset..offset + 4] != SNOD_SIGNATURE {
            return Err(FormatError::InvalidSymbolTableNodeSignature);
        }
        let version = file[offset + 4];
        if version != 1 {
            return Err(FormatError::InvalidSymbolTableNodeVersion(version));
        }
        let count = u16::from_le_bytes([file[offset + 6], file[offset + 7]]) as usize;

        // name offset, header address, cache type, reserved, scratch pad
        let os = offset_size as usize;
        let entry_size = 2 * os + 24;
        let start = offset + 8;
        ensure_len(file, start, count * entry_size)?;
        let entries = (0..count)
            .map(|i| {
                let pos = start + i * entry_size;
                Ok(SymbolEntry {
                    name_offset: read_sized(file, pos, offset_size)?,
                    object_header_address: read_address(file, pos + os, offset_size)?,
                    cache_type: read_sized(file, pos + 2 * os, 4)? as u32,
                })
            })
            .collect::<Result<Vec<_>, FormatError>>()?;
        Ok(SymbolTableNode { entries })
    }
}

/// Every (name, object header address) pair of a symbol-table group, in
/// B-tree order. Soft links are rejected.
pub fn group_entries(
    file: &[u8],
    table: &SymbolTableMessage,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<(String, u64)>, FormatError> {
    let heap_at = to_offset(file, table.local_heap_address)?;
    let heap = LocalHeap::parse(file, heap_at, offset_size, length_size)?;
    let mut out = Vec::new();
    for node_address in collect_symbol_nodes(file, table.btree_address, offset_size, length_size)? {
        let node = SymbolTableNode::parse(file, to_offset(file, node_address)?, offset_size)?;
        for entry in node.entries {
            let name = heap.read_string(file, entry.name_offset)?;
            if entry.cache_type == CACHE_SOFT_LINK || entry.object_header_address == UNDEFINED_ADDRESS {
                return Err(FormatError::Unsupported(format!("soft link \"{name}\"")));
            }
            out.push((name, entry.object_header_address));
        }
    }
    Ok(out)
}

fn to_offset(file: &[u8], address: u64) -> Result<usize, FormatError> {
    usize::try_from(address).map_err(|_| FormatError::UnexpectedEof {
        expected: usize::MAX,
        available: file.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snod(entries: &[(u64, u64, u32)]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"SNOD");
        buf.push(1);
        buf.push(0);
        buf.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (name, addr, cache) in entries {
            buf.extend_from_slice(&name.to_le_bytes());
            buf.extend_from_slice(&addr.to_le_bytes());
            buf.extend_from_slice(&cache.to_le_bytes());
            buf.extend_from_slice(&[0; 20]);
        }
        buf
    }

    /// Heap at 0 (segment at 64), leaf B-tree at 128, symbol node at 256.
    fn group_file(names: &[&str], cache: u32) -> (Vec<u8>, SymbolTableMessage) {
        let mut segment = vec![0u8];
        let mut entries = Vec::new();
        for (i, name) in names.iter().enumerate() {
            entries.push((segment.len() as u64, 0x1000 + i as u64 * 0x100, cache));
            segment.extend_from_slice(name.as_bytes());
            segment.push(0);
        }
        let mut file = Vec::new();
        file.extend_from_slice(b"HEAP");
        file.extend_from_slice(&[0; 4]);
        file.extend_from_slice(&(segment.len() as u64).to_le_bytes());
        file.extend_from_slice(&u64::MAX.to_le_bytes());
        file.extend_from_slice(&64u64.to_le_bytes());
        file.resize(64, 0);
        file.extend_from_slice(&segment);

        file.resize(128, 0);
        file.extend_from_slice(b"TREE");
        file.extend_from_slice(&[0, 0, 1, 0]);
        file.extend_from_slice(&u64::MAX.to_le_bytes());
        file.extend_from_slice(&u64::MAX.to_le_bytes());
        file.extend_from_slice(&0u64.to_le_bytes());
        file.extend_from_slice(&256u64.to_le_bytes());
        file.extend_from_slice(&0u64.to_le_bytes());

        file.resize(256, 0);
        file.extend_from_slice(&snod(&entries));
        let table = SymbolTableMessage {
            btree_address: 128,
            local_heap_address: 0,
        };
        (file, table)
    }

    #[test]
    fn message_fields() {
        let mut data = 0x80u64.to_le_bytes().to_vec();
        data.extend_from_slice(&0x200u64.to_le_bytes());
        let msg = SymbolTableMessage::parse(&data, 8).unwrap();
        assert_eq!(msg.btree_address, 0x80);
        assert_eq!(msg.local_heap_address, 0x200);
        assert!(SymbolTableMessage::parse(&data[..12], 8).is_err());
    }

    #[test]
    fn node_entries() {
        let bytes = snod(&[(8, 0x400, 0), (16, 0x800, 1)]);
        let node = SymbolTableNode::parse(&bytes, 0, 8).unwrap();
        assert_eq!(node.entries.len(), 2);
        assert_eq!(node.entries[1].name_offset, 16);
        assert_eq!(node.entries[1].object_header_address, 0x800);
        assert_eq!(node.entries[1].cache_type, 1);
    }

    #[test]
    fn node_version_checked() {
        let mut bytes = snod(&[]);
        bytes[4] = 2;
        assert_eq!(
            SymbolTableNode::parse(&bytes, 0, 8).unwrap_err(),
            FormatError::InvalidSymbolTableNodeVersion(2)
        );
    }

    #[test]
    fn entries_resolve_names() {
        let (file, table) = group_file(&["temp", "pressure"], 0);
        let entries = group_entries(&file, &table, 8, 8).unwrap();
        assert_eq!(
            entries,
            vec![("temp".to_string(), 0x1000), ("pressure".to_string(), 0x1100)]
        );
    }

    #[test]
    fn soft_link_rejected() {
        let (file, table) = group_file(&["alias"], CACHE_SOFT_LINK);
        assert!(matches!(
            group_entries(&file, &table, 8, 8),
            Err(FormatError::Unsupported(_))
        ));
    }
}
