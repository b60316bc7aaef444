//! Re-opening containers: inventory of the root group's datasets.
//!
//! Only files whose layout can be carried into a rewritten file are
//! accepted: a superblock without extension or driver information, a root
//! group with compact links or a symbol table, inline attributes, and
//! datasets with contiguous or compact storage whose header messages are
//! not shared.

use std::borrow::Cow;

use crate::attribute::AttributeMessage;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::link_message::LinkMessage;
use crate::message_type::MessageType;
use crate::object_header::{HeaderMessage, ObjectHeader};
use crate::signature::find_signature;
use crate::superblock::{is_undefined, Superblock, UNDEFINED_ADDRESS};
use crate::symbol_table::{group_entries, SymbolTableMessage};

/// One dataset linked from the root group.
#[derive(Debug, Clone)]
pub struct StoredDataset {
    /// Link name.
    pub name: String,
    /// Object header address.
    pub address: u64,
    /// Parsed object header.
    pub header: ObjectHeader,
    length_size: u8,
    offset_size: u8,
}

impl StoredDataset {
    pub fn dataspace(&self) -> Result<Dataspace, FormatError> {
        let msg = self
            .header
            .find(MessageType::Dataspace)
            .ok_or(FormatError::MissingMessage("dataspace"))?;
        Dataspace::parse(&msg.data, self.length_size)
    }

    pub fn datatype(&self) -> Result<Datatype, FormatError> {
        let msg = self
            .header
            .find(MessageType::Datatype)
            .ok_or(FormatError::MissingMessage("datatype"))?;
        Datatype::parse(&msg.data)
    }

    pub fn layout(&self) -> Result<DataLayout, FormatError> {
        let msg = self
            .header
            .find(MessageType::DataLayout)
            .ok_or(FormatError::MissingMessage("data layout"))?;
        DataLayout::parse(&msg.data, self.offset_size, self.length_size)
    }

    /// Current extents.
    pub fn shape(&self) -> Result<Vec<u64>, FormatError> {
        Ok(self.dataspace()?.dimensions)
    }

    pub fn attributes(&self) -> Result<Vec<AttributeMessage>, FormatError> {
        self.header
            .find_all(MessageType::Attribute)
            .map(|m| AttributeMessage::parse(&m.data, self.length_size))
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeMessage> {
        self.attributes()
            .ok()?
            .into_iter()
            .find(|a| a.name == name)
    }

    /// True for netCDF dimensions and coordinate variables.
    pub fn is_dimension_scale(&self) -> bool {
        self.attribute("CLASS")
            .and_then(|a| a.as_string())
            .is_some_and(|s| s == "DIMENSION_SCALE")
    }

    /// Packed element bytes. Unallocated storage reads as zero fill.
    pub fn raw_data<'f>(&self, file: &'f [u8]) -> Result<Cow<'f, [u8]>, FormatError> {
        match self.layout()? {
            DataLayout::Compact { data } => Ok(Cow::Owned(data)),
            DataLayout::Contiguous {
                address: Some(addr),
                size,
            } => {
                let start = addr as usize;
                let end = start.saturating_add(size as usize);
                file.get(start..end)
                    .map(Cow::Borrowed)
                    .ok_or(FormatError::UnexpectedEof {
                        expected: end,
                        available: file.len(),
                    })
            }
            DataLayout::Contiguous { address: None, .. } => {
                let n = self.dataspace()?.num_elements() * self.datatype()?.type_size() as u64;
                Ok(Cow::Owned(vec![0; n as usize]))
            }
        }
    }

    /// Element values converted to f64, honouring the stored byte order.
    pub fn read_f64(&self, file: &[u8]) -> Result<Vec<f64>, FormatError> {
        self.datatype()?.decode_f64(&self.raw_data(file)?)
    }
}

/// Everything the root group of a container holds.
#[derive(Debug, Clone)]
pub struct FileInventory {
    pub superblock: Superblock,
    /// Root group attribute messages, still encoded.
    pub root_attributes: Vec<HeaderMessage>,
    /// Datasets in link order.
    pub datasets: Vec<StoredDataset>,
}

impl FileInventory {
    /// Parse the root group of `file`.
    pub fn parse(file: &[u8]) -> Result<FileInventory, FormatError> {
        let sig = find_signature(file)?;
        if sig != 0 {
            return Err(FormatError::Unsupported(format!("user block of {sig} bytes")));
        }
        let superblock = Superblock::parse(file, sig)?;
        if superblock.base_address != 0 {
            return Err(FormatError::Unsupported("non-zero base address".into()));
        }
        if superblock.extension_address != UNDEFINED_ADDRESS {
            return Err(FormatError::Unsupported("superblock extension".into()));
        }
        if superblock.driver_info_address != UNDEFINED_ADDRESS {
            return Err(FormatError::Unsupported("file driver information".into()));
        }
        let (os, ls) = (superblock.offset_size, superblock.length_size);

        let root = ObjectHeader::parse(file, to_offset(file, superblock.root_group_address)?, os, ls)?;
        ensure_carriable(&root, "root group", os)?;
        let links = match root.find(MessageType::SymbolTable) {
            Some(msg) => group_entries(file, &SymbolTableMessage::parse(&msg.data, os)?, os, ls)?,
            None => compact_links(&root, os)?,
        };

        let root_attributes: Vec<HeaderMessage> =
            root.find_all(MessageType::Attribute).cloned().collect();

        let mut datasets = Vec::new();
        for (name, address) in links {
            let header = ObjectHeader::parse(file, to_offset(file, address)?, os, ls)?;
            if header.find(MessageType::DataLayout).is_none() {
                return Err(FormatError::Unsupported(format!("non-dataset object \"{name}\"")));
            }
            ensure_carriable(&header, &name, os)?;
            if header.find(MessageType::FilterPipeline).is_some() {
                return Err(FormatError::Unsupported(format!("filtered dataset \"{name}\"")));
            }
            let ds = StoredDataset {
                name,
                address,
                header,
                length_size: ls,
                offset_size: os,
            };
            ds.layout()?;
            datasets.push(ds);
        }

        Ok(FileInventory {
            superblock,
            root_attributes,
            datasets,
        })
    }

    pub fn dataset(&self, name: &str) -> Option<&StoredDataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn root_attribute(&self, name: &str) -> Option<AttributeMessage> {
        self.root_attributes
            .iter()
            .filter_map(|m| AttributeMessage::parse(&m.data, self.superblock.length_size).ok())
            .find(|a| a.name == name)
    }
}

/// Links of a root group using compact link storage.
fn compact_links(root: &ObjectHeader, offset_size: u8) -> Result<Vec<(String, u64)>, FormatError> {
    if let Some(li) = root.find(MessageType::LinkInfo) {
        let heap_pos = if li.data.get(1).is_some_and(|f| f & 0x01 != 0) { 10 } else { 2 };
        if !is_undefined(&li.data, heap_pos, offset_size) {
            return Err(FormatError::Unsupported("dense link storage".into()));
        }
    }
    root.find_all(MessageType::Link)
        .map(|msg| LinkMessage::parse(&msg.data, offset_size).map(|l| (l.name, l.address)))
        .collect()
}

fn to_offset(file: &[u8], address: u64) -> Result<usize, FormatError> {
    usize::try_from(address).map_err(|_| FormatError::UnexpectedEof {
        expected: usize::MAX,
        available: file.len(),
    })
}

/// Reject headers that reference shared or densely stored messages.
fn ensure_carriable(header: &ObjectHeader, what: &str, offset_size: u8) -> Result<(), FormatError> {
    if header.messages.iter().any(HeaderMessage::is_shared) {
        return Err(FormatError::Unsupported(format!("shared message in {what}")));
    }
    if let Some(ai) = header.find(MessageType::AttributeInfo) {
        let heap_pos = if ai.data.get(1).is_some_and(|f| f & 0x01 != 0) { 4 } else { 2 };
        if !is_undefined(&ai.data, heap_pos, offset_size) {
            return Err(FormatError::Unsupported(format!("dense attributes in {what}")));
        }
    }
    Ok(())
}
