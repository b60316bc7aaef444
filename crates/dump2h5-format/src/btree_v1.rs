//! Version 1 B-trees indexing the symbol nodes of a group.

use std::collections::HashSet;

use crate::error::FormatError;
use crate::superblock::{ensure_len, read_sized};

const TREE_SIGNATURE: [u8; 4] = *b"TREE";

/// Node type of group B-trees.
const GROUP_NODE: u8 = 0;

/// A parsed group B-tree node. Keys (heap offsets) are skipped.
#[derive(Debug, Clone)]
pub struct BTreeNode {
    /// 0 for leaves, whose children are symbol nodes.
    pub level: u8,
    /// Child addresses in key order.
    pub children: Vec<u64>,
}

impl BTreeNode {
    pub fn parse(
        file: &[u8],
        offset: usize,
        offset_size: u8,
        length_size: u8,
    ) -> Result<BTreeNode, FormatError> {
        let (os, ls) = (offset_size as usize, length_size as usize);
        // signature, type, level, entries used, left and right siblings
        ensure_len(file, offset, 8 + 2 * os)?;
        if file[offset..offset + 4] != TREE_SIGNATURE {
            return Err(FormatError::InvalidBTreeSignature);
        }
        let node_type = file[offset + 4];
        if node_type != GROUP_NODE {
            return Err(FormatError::InvalidBTreeNodeType(node_type));
        }
        let level = file[offset + 5];
        let entries = u16::from_le_bytes([file[offset + 6], file[offset + 7]]) as usize;

        // key, child, key, child, ..., key
        let start = offset + 8 + 2 * os;
        ensure_len(file, start, entries * (ls + os) + ls)?;
        let children = (0..entries)
            .map(|i| read_sized(file, start + i * (ls + os) + ls, offset_size))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BTreeNode { level, children })
    }
}

/// Addresses of every symbol node reachable from the tree rooted at `root`.
pub fn collect_symbol_nodes(
    file: &[u8],
    root: u64,
    offset_size: u8,
    length_size: u8,
) -> Result<Vec<u64>, FormatError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    walk(file, root, offset_size, length_size, &mut seen, &mut out)?;
    Ok(out)
}

fn walk(
    file: &[u8],
    address: u64,
    offset_size: u8,
    length_size: u8,
    seen: &mut HashSet<u64>,
    out: &mut Vec<u64>,
) -> Result<(), FormatError> {
    if !seen.insert(address) {
        return Err(FormatError::CyclicStructure(address));
    }
    let offset = usize::try_from(address).map_err(|_| FormatError::UnexpectedEof {
        expected: usize::MAX,
        available: file.len(),
    })?;
    let node = BTreeNode::parse(file, offset, offset_size, length_size)?;
    if node.level == 0 {
        out.extend(node.children);
        return Ok(());
    }
    for child in node.children {
        walk(file, child, offset_size, length_size, seen, out)?;
    }
    Ok(())
}
