//! Builds files in the older layout: a version 0 superblock and a root group
//! stored as a symbol table, with version 1 object headers throughout.

use dump2h5_format::data_layout::DataLayout;
use dump2h5_format::{AttrValue, ByteOrder, Datatype};

const SUPERBLOCK_LEN: usize = 96;
const SNOD_ENTRY_LEN: usize = 40;

fn pad8(mut v: Vec<u8>) -> Vec<u8> {
    v.resize(v.len().div_ceil(8) * 8, 0);
    v
}

fn v1_header(messages: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (msg_type, data) in messages {
        let data = pad8(data.clone());
        body.extend_from_slice(&msg_type.to_le_bytes());
        body.extend_from_slice(&(data.len() as u16).to_le_bytes());
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(&data);
    }
    let mut buf = vec![1, 0];
    buf.extend_from_slice(&(messages.len() as u16).to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&[0; 4]);
    buf.extend_from_slice(&body);
    buf
}

fn dataspace_v1(len: usize) -> Vec<u8> {
    let mut buf = vec![1, 1, 0, 0, 0, 0, 0, 0];
    buf.extend_from_slice(&(len as u64).to_le_bytes());
    buf
}

fn dataset_header(len: usize, data_address: u64) -> Vec<u8> {
    let layout = DataLayout::Contiguous {
        address: Some(data_address),
        size: len as u64 * 8,
    };
    v1_header(&[
        (0x0003, Datatype::f64(ByteOrder::BigEndian).serialize()),
        (0x0001, dataspace_v1(len)),
        (0x0008, layout.serialize()),
    ])
}

fn superblock_v0(root: u64, eof: u64) -> Vec<u8> {
    let mut buf = b"\x89HDF\r\n\x1a\n".to_vec();
    buf.extend_from_slice(&[0, 0, 0, 0, 0, 8, 8, 0]);
    buf.extend_from_slice(&4u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&u64::MAX.to_le_bytes());
    buf.extend_from_slice(&eof.to_le_bytes());
    buf.extend_from_slice(&u64::MAX.to_le_bytes());
    buf.extend_from_slice(&0u64.to_le_bytes());
    buf.extend_from_slice(&root.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&[0; 20]);
    buf
}

/// A version 0 file whose root group holds big-endian f64 vectors and a
/// `title` attribute.
pub fn v0_file(datasets: &[(&str, Vec<f64>)]) -> Vec<u8> {
    let title = AttrValue::String("legacy".into())
        .to_message("title")
        .serialize();
    let root_len = v1_header(&[(0x0011, vec![0; 16]), (0x000C, title.clone())]).len();

    let btree_at = SUPERBLOCK_LEN + root_len;
    let heap_at = btree_at + 48;
    let segment_at = heap_at + 32;
    let mut segment = vec![0u8];
    let mut name_offsets = Vec::new();
    for (name, _) in datasets {
        name_offsets.push(segment.len() as u64);
        segment.extend_from_slice(name.as_bytes());
        segment.push(0);
    }
    let segment = pad8(segment);
    let snod_at = segment_at + segment.len();

    let header_lens: Vec<usize> = datasets
        .iter()
        .map(|(_, v)| dataset_header(v.len(), 0).len())
        .collect();
    let mut header_at = snod_at + 8 + datasets.len() * SNOD_ENTRY_LEN;
    let mut data_at = header_at + header_lens.iter().sum::<usize>();
    let mut headers = Vec::new();
    let mut entries = Vec::new();
    for (i, (_, values)) in datasets.iter().enumerate() {
        entries.push((name_offsets[i], header_at as u64));
        headers.extend_from_slice(&dataset_header(values.len(), data_at as u64));
        header_at += header_lens[i];
        data_at += values.len() * 8;
    }
    let eof = data_at as u64;

    let mut table = (btree_at as u64).to_le_bytes().to_vec();
    table.extend_from_slice(&(heap_at as u64).to_le_bytes());

    let mut file = superblock_v0(SUPERBLOCK_LEN as u64, eof);
    file.extend_from_slice(&v1_header(&[(0x0011, table), (0x000C, title)]));

    file.extend_from_slice(b"TREE");
    file.extend_from_slice(&[0, 0, 1, 0]);
    file.extend_from_slice(&u64::MAX.to_le_bytes());
    file.extend_from_slice(&u64::MAX.to_le_bytes());
    file.extend_from_slice(&0u64.to_le_bytes());
    file.extend_from_slice(&(snod_at as u64).to_le_bytes());
    file.extend_from_slice(&name_offsets.last().copied().unwrap_or(0).to_le_bytes());

    file.extend_from_slice(b"HEAP");
    file.extend_from_slice(&[0; 4]);
    file.extend_from_slice(&(segment.len() as u64).to_le_bytes());
    file.extend_from_slice(&u64::MAX.to_le_bytes());
    file.extend_from_slice(&(segment_at as u64).to_le_bytes());
    file.extend_from_slice(&segment);

    file.extend_from_slice(b"SNOD");
    file.extend_from_slice(&[1, 0]);
    file.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (name_offset, address) in entries {
        file.extend_from_slice(&name_offset.to_le_bytes());
        file.extend_from_slice(&address.to_le_bytes());
        file.extend_from_slice(&[0; 24]);
    }

    file.extend_from_slice(&headers);
    for (_, values) in datasets {
        for v in values.iter() {
            file.extend_from_slice(&v.to_be_bytes());
        }
    }
    assert_eq!(file.len() as u64, eof);
    file
}
