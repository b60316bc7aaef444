//! HDF5 file creation (write pipeline).
//!
//! Produces HDF5 files with a v3 superblock, a root group holding compact
//! hard links, v2 object headers, contiguous datasets and inline attributes.
//! Payloads are kept as borrowed slices where possible and are only copied
//! when the file is written out.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::attribute::{AttrValue, AttributeMessage};
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::file_reader::FileInventory;
use crate::link_message::LinkMessage;
use crate::message_type::MessageType;
use crate::object_header::HeaderMessage;
use crate::object_header_writer::ObjectHeaderWriter;
use crate::superblock::{Superblock, SUPERBLOCK_V3_SIZE, UNDEFINED_ADDRESS};

/// FillValue v3: alloc time late, write time if-set, no value defined.
const FILL_VALUE_MESSAGE: [u8; 2] = [3, 0x0a];

/// Builder for one new dataset.
#[derive(Debug)]
pub struct DatasetBuilder<'a> {
    name: String,
    datatype: Option<Datatype>,
    shape: Option<Vec<u64>>,
    data: Option<Cow<'a, [u8]>>,
    unallocated: bool,
    attrs: Vec<AttributeMessage>,
}

impl<'a> DatasetBuilder<'a> {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            datatype: None,
            shape: None,
            data: None,
            unallocated: false,
            attrs: Vec::new(),
        }
    }

    pub fn with_datatype(&mut self, datatype: Datatype) -> &mut Self {
        self.datatype = Some(datatype);
        self
    }

    pub fn with_shape(&mut self, shape: &[u64]) -> &mut Self {
        self.shape = Some(shape.to_vec());
        self
    }

    /// Packed element bytes, already in the datatype's byte order.
    pub fn with_data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = Some(Cow::Borrowed(data));
        self.unallocated = false;
        self
    }

    pub fn with_owned_data(&mut self, data: Vec<u8>) -> &mut Self {
        self.data = Some(Cow::Owned(data));
        self.unallocated = false;
        self
    }

    /// Define the dataset without storage; readers see fill values.
    pub fn unallocated(&mut self) -> &mut Self {
        self.data = None;
        self.unallocated = true;
        self
    }

    pub fn set_attr(&mut self, name: &str, value: AttrValue) -> &mut Self {
        self.attrs.retain(|a| a.name != name);
        self.attrs.push(value.to_message(name));
        self
    }
}

/// A dataset copied from an existing file with its header messages intact.
#[derive(Debug)]
struct CarriedDataset<'a> {
    name: String,
    messages: Vec<HeaderMessage>,
    layout_index: usize,
    payload: Option<Cow<'a, [u8]>>,
}

/// Metadata block plus the payloads that follow it, in file order.
#[derive(Debug)]
pub struct FileLayout<'a> {
    /// Superblock and every object header.
    pub metadata: Vec<u8>,
    /// Contiguous dataset payloads, written back to back after the metadata.
    pub payloads: Vec<Cow<'a, [u8]>>,
}

impl FileLayout<'_> {
    /// Total file size in bytes.
    pub fn len(&self) -> u64 {
        self.metadata.len() as u64 + self.payloads.iter().map(|p| p.len() as u64).sum::<u64>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stream the file to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.metadata)?;
        for payload in &self.payloads {
            out.write_all(payload)?;
        }
        out.flush()
    }

    /// The whole file as one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len() as usize);
        buf.extend_from_slice(&self.metadata);
        for payload in &self.payloads {
            buf.extend_from_slice(payload);
        }
        buf
    }
}

/// A dataset header waiting for its final addresses.
struct Planned<'a> {
    name: String,
    messages: Vec<HeaderMessage>,
    layout_index: usize,
    /// Declared storage size, used when there is no payload.
    storage_size: u64,
    payload: Option<Cow<'a, [u8]>>,
}

impl Planned<'_> {
    /// Encode the object header with the payload placed at `data_address`.
    ///
    /// An empty layout slot without payload becomes unallocated contiguous
    /// storage; a filled slot without payload is kept verbatim.
    fn encode_header(&self, data_address: u64) -> Result<Vec<u8>, FormatError> {
        let mut messages = self.messages.clone();
        let layout = match &self.payload {
            Some(data) => Some(DataLayout::Contiguous {
                address: Some(data_address),
                size: data.len() as u64,
            }),
            None if messages[self.layout_index].data.is_empty() => Some(DataLayout::Contiguous {
                address: None,
                size: self.storage_size,
            }),
            None => None,
        };
        if let Some(layout) = layout {
            messages[self.layout_index].data = layout.serialize();
        }
        let mut w = ObjectHeaderWriter::new();
        for m in messages {
            w.add_raw(m);
        }
        w.serialize()
    }
}

/// The main file creation API.
#[derive(Debug, Default)]
pub struct FileWriter<'a> {
    carried: Vec<CarriedDataset<'a>>,
    created: Vec<DatasetBuilder<'a>>,
    carried_attrs: Vec<(String, HeaderMessage)>,
    root_attrs: Vec<AttributeMessage>,
}

impl<'a> FileWriter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the contents of an existing file. Datasets and root
    /// attributes keep their encoded header messages; contiguous payloads
    /// are borrowed from `file`.
    pub fn from_inventory(inventory: &FileInventory, file: &'a [u8]) -> Result<Self, FormatError> {
        // Carried messages embed addresses and lengths at the source widths.
        let sb = &inventory.superblock;
        if sb.offset_size != 8 || sb.length_size != 8 {
            return Err(FormatError::Unsupported(format!(
                "{}-byte offsets and {}-byte lengths",
                sb.offset_size, sb.length_size
            )));
        }
        let mut writer = Self::new();
        for ds in &inventory.datasets {
            let layout_index = ds
                .header
                .messages
                .iter()
                .position(|m| m.msg_type == MessageType::DataLayout)
                .ok_or(FormatError::MissingMessage("data layout"))?;
            let payload = match ds.layout()? {
                DataLayout::Contiguous {
                    address: Some(addr),
                    size,
                } => {
                    let start = addr as usize;
                    let end = start.saturating_add(size as usize);
                    match file.get(start..end) {
                        Some(bytes) => Some(Cow::Borrowed(bytes)),
                        None => {
                            return Err(FormatError::UnexpectedEof {
                                expected: end,
                                available: file.len(),
                            })
                        }
                    }
                }
                _ => None,
            };
            writer.carried.push(CarriedDataset {
                name: ds.name.clone(),
                messages: ds.header.messages.clone(),
                layout_index,
                payload,
            });
        }
        for raw in &inventory.root_attributes {
            let parsed = AttributeMessage::parse(&raw.data, inventory.superblock.length_size)?;
            writer.carried_attrs.push((parsed.name, raw.clone()));
        }
        Ok(writer)
    }

    /// True if a dataset named `name` is already defined.
    pub fn contains(&self, name: &str) -> bool {
        self.carried.iter().any(|d| d.name == name) || self.created.iter().any(|d| d.name == name)
    }

    pub fn create_dataset(&mut self, name: &str) -> &mut DatasetBuilder<'a> {
        self.created.push(DatasetBuilder::new(name));
        let last = self.created.len() - 1;
        &mut self.created[last]
    }

    /// Set a root group attribute, replacing any existing one of that name.
    pub fn set_root_attr(&mut self, name: &str, value: AttrValue) {
        self.carried_attrs.retain(|(n, _)| n != name);
        self.root_attrs.retain(|a| a.name != name);
        self.root_attrs.push(value.to_message(name));
    }

    pub fn finish(self) -> Result<FileLayout<'a>, FormatError> {
        let mut planned: Vec<Planned<'a>> = Vec::new();
        for c in self.carried {
            planned.push(Planned {
                name: c.name,
                messages: c.messages,
                layout_index: c.layout_index,
                storage_size: 0,
                payload: c.payload,
            });
        }
        for db in self.created {
            let (datatype, shape) = match (db.datatype, db.shape) {
                (Some(dt), Some(shape)) => (dt, shape),
                _ => return Err(FormatError::IncompleteDataset(db.name)),
            };
            if db.data.is_none() && !db.unallocated {
                return Err(FormatError::IncompleteDataset(db.name));
            }
            let dataspace = Dataspace::simple(&shape);
            let expected = dataspace.num_elements() * datatype.type_size() as u64;
            if let Some(data) = &db.data {
                if data.len() as u64 != expected {
                    return Err(FormatError::DataSizeMismatch {
                        name: db.name,
                        expected,
                        actual: data.len() as u64,
                    });
                }
            }

            let mut messages = vec![
                HeaderMessage {
                    msg_type: MessageType::Datatype,
                    flags: 0x01,
                    data: datatype.serialize(),
                },
                HeaderMessage {
                    msg_type: MessageType::Dataspace,
                    flags: 0,
                    data: dataspace.serialize(),
                },
                HeaderMessage {
                    msg_type: MessageType::FillValue,
                    flags: 0x01,
                    data: FILL_VALUE_MESSAGE.to_vec(),
                },
                HeaderMessage {
                    msg_type: MessageType::DataLayout,
                    flags: 0,
                    data: Vec::new(),
                },
            ];
            for attr in &db.attrs {
                messages.push(HeaderMessage {
                    msg_type: MessageType::Attribute,
                    flags: 0,
                    data: attr.serialize(),
                });
            }
            planned.push(Planned {
                name: db.name,
                messages,
                layout_index: 3,
                storage_size: expected,
                payload: db.data,
            });
        }

        for (i, p) in planned.iter().enumerate() {
            if planned[..i].iter().any(|q| q.name == p.name) {
                return Err(FormatError::DuplicateName(p.name.clone()));
            }
        }

        let mut root_attr_messages: Vec<HeaderMessage> =
            self.carried_attrs.into_iter().map(|(_, m)| m).collect();
        for attr in &self.root_attrs {
            root_attr_messages.push(HeaderMessage {
                msg_type: MessageType::Attribute,
                flags: 0,
                data: attr.serialize(),
            });
        }

        // Pass 1: header sizes with placeholder addresses. Link and layout
        // encodings have a fixed width, so the sizes carry over to pass 2.
        let dummy_links: Vec<LinkMessage> =
            planned.iter().map(|p| LinkMessage::hard(&p.name, 0)).collect();
        let root_oh_size = build_group_oh(&dummy_links, &root_attr_messages)?.len();
        let mut ds_oh_sizes = Vec::with_capacity(planned.len());
        for p in &planned {
            ds_oh_sizes.push(p.encode_header(0)?.len());
        }

        // Pass 2: real addresses.
        let root_group_addr = SUPERBLOCK_V3_SIZE as u64;
        let mut cursor = root_group_addr + root_oh_size as u64;
        let mut ds_oh_addrs = Vec::with_capacity(planned.len());
        for size in &ds_oh_sizes {
            ds_oh_addrs.push(cursor);
            cursor += *size as u64;
        }

        let mut ds_headers = Vec::with_capacity(planned.len());
        let mut payloads = Vec::new();
        for p in planned.iter_mut() {
            ds_headers.push(p.encode_header(cursor)?);
            if let Some(data) = p.payload.take() {
                cursor += data.len() as u64;
                payloads.push(data);
            }
        }
        debug_assert_eq!(
            ds_headers.iter().map(Vec::len).collect::<Vec<_>>(),
            ds_oh_sizes
        );

        let links: Vec<LinkMessage> = planned
            .iter()
            .zip(&ds_oh_addrs)
            .map(|(p, &addr)| LinkMessage::hard(&p.name, addr))
            .collect();

        let mut metadata = Vec::with_capacity(cursor as usize);
        metadata.extend_from_slice(&Superblock::new_v3(root_group_addr, cursor).serialize());
        metadata.extend_from_slice(&build_group_oh(&links, &root_attr_messages)?);
        for oh in &ds_headers {
            metadata.extend_from_slice(oh);
        }

        let layout = FileLayout { metadata, payloads };
        debug_assert_eq!(layout.len(), cursor);
        Ok(layout)
    }
}

fn build_group_oh(links: &[LinkMessage], attrs: &[HeaderMessage]) -> Result<Vec<u8>, FormatError> {
    let mut w = ObjectHeaderWriter::new();
    // LinkInfo v0: no creation order, fractal heap and name index undefined.
    let mut li = vec![0u8, 0];
    li.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
    li.extend_from_slice(&UNDEFINED_ADDRESS.to_le_bytes());
    w.add_message(MessageType::LinkInfo, li);
    w.add_message(MessageType::GroupInfo, vec![0, 0]);
    for link in links {
        w.add_message(MessageType::Link, link.serialize());
    }
    for attr in attrs {
        w.add_raw(attr.clone());
    }
    w.serialize()
}
