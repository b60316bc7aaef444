//! HDF5 Attribute message (message type 0x000C).

use byteorder::{ByteOrder as _, LittleEndian};

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::superblock::ensure_len;

/// A parsed or to-be-written attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMessage {
    /// Attribute name.
    pub name: String,
    /// Element type.
    pub datatype: Datatype,
    /// Shape of the attribute value.
    pub dataspace: Dataspace,
    /// Packed element bytes.
    pub raw_data: Vec<u8>,
}

/// Attribute values the writers attach.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Scalar little-endian i32.
    I32(i32),
    /// 1-D array of little-endian i32.
    I32Array(Vec<i32>),
    /// Scalar null-terminated ASCII string.
    String(String),
}

impl AttrValue {
    /// Encode as an attribute message named `name`.
    pub fn to_message(&self, name: &str) -> AttributeMessage {
        let (datatype, dataspace, raw_data) = match self {
            AttrValue::I32(v) => (
                Datatype::i32_le(),
                Dataspace::scalar(),
                v.to_le_bytes().to_vec(),
            ),
            AttrValue::I32Array(vs) => (
                Datatype::i32_le(),
                Dataspace::simple(&[vs.len() as u64]),
                vs.iter().flat_map(|v| v.to_le_bytes()).collect(),
            ),
            AttrValue::String(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                (
                    Datatype::c_string(bytes.len() as u32),
                    Dataspace::scalar(),
                    bytes,
                )
            }
        };
        AttributeMessage {
            name: name.to_string(),
            datatype,
            dataspace,
            raw_data,
        }
    }
}

impl AttributeMessage {
    /// Parse an attribute message (versions 1, 2 and 3).
    pub fn parse(data: &[u8], length_size: u8) -> Result<AttributeMessage, FormatError> {
        ensure_len(data, 0, 8)?;
        let version = data[0];
        if !matches!(version, 1..=3) {
            return Err(FormatError::InvalidAttributeVersion(version));
        }
        if version >= 2 && data[1] & 0x03 != 0 {
            return Err(FormatError::Unsupported(
                "attribute with shared datatype or dataspace".into(),
            ));
        }
        let name_size = LittleEndian::read_u16(&data[2..4]) as usize;
        let datatype_size = LittleEndian::read_u16(&data[4..6]) as usize;
        let dataspace_size = LittleEndian::read_u16(&data[6..8]) as usize;
        let mut pos = if version == 3 { 9 } else { 8 };

        let pad = |n: usize| if version == 1 { (n + 7) & !7 } else { n };

        ensure_len(data, pos, name_size)?;
        let name_bytes = &data[pos..pos + name_size];
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_size);
        let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();
        pos += pad(name_size);

        ensure_len(data, pos, datatype_size)?;
        let datatype = Datatype::parse(&data[pos..pos + datatype_size])?;
        pos += pad(datatype_size);

        ensure_len(data, pos, dataspace_size)?;
        let dataspace = Dataspace::parse(&data[pos..pos + dataspace_size], length_size)?;
        pos += pad(dataspace_size);

        let data_len = (dataspace.num_elements() * datatype.type_size() as u64) as usize;
        ensure_len(data, pos, data_len)?;
        let raw_data = data[pos..pos + data_len].to_vec();

        Ok(AttributeMessage {
            name,
            datatype,
            dataspace,
            raw_data,
        })
    }

    /// Serialize as a version 2 attribute message.
    pub fn serialize(&self) -> Vec<u8> {
        let mut name = self.name.as_bytes().to_vec();
        name.push(0);
        let dt = self.datatype.serialize();
        let ds = self.dataspace.serialize();

        let mut buf = Vec::with_capacity(8 + name.len() + dt.len() + ds.len() + self.raw_data.len());
        buf.push(2);
        buf.push(0);
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
        buf.extend_from_slice(&name);
        buf.extend_from_slice(&dt);
        buf.extend_from_slice(&ds);
        buf.extend_from_slice(&self.raw_data);
        buf
    }

    /// String value with trailing padding removed, if this is a string attribute.
    pub fn as_string(&self) -> Option<String> {
        match self.datatype {
            Datatype::String { .. } => {
                let end = self
                    .raw_data
                    .iter()
                    .rposition(|&b| b != 0 && b != b' ')
                    .map_or(0, |p| p + 1);
                Some(String::from_utf8_lossy(&self.raw_data[..end]).into_owned())
            }
            _ => None,
        }
    }

    /// Integer values, if this is an integer attribute.
    pub fn as_i64s(&self) -> Option<Vec<i64>> {
        self.datatype.decode_i64(&self.raw_data).ok()
    }
}
