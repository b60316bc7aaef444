//! HDF5 Datatype message (message type 0x0003).
//!
//! Only the classes a dataset container needs are modelled: fixed-point
//! integers, IEEE 754 floats and fixed-length strings.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::error::FormatError;
use crate::superblock::ensure_len;

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the running host.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }
}

/// String padding type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringPadding {
    NullTerminate,
    NullPad,
    SpacePad,
}

/// Character set encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    Ascii,
    Utf8,
}

/// Parsed HDF5 datatype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    /// Class 0: integers.
    FixedPoint {
        size: u32,
        byte_order: ByteOrder,
        signed: bool,
    },
    /// Class 1: IEEE 754 binary32 or binary64.
    FloatingPoint { size: u32, byte_order: ByteOrder },
    /// Class 3: fixed-length string.
    String {
        size: u32,
        padding: StringPadding,
        charset: CharacterSet,
    },
}

impl Datatype {
    /// 4-byte IEEE float in the given byte order.
    pub fn f32(byte_order: ByteOrder) -> Self {
        Datatype::FloatingPoint {
            size: 4,
            byte_order,
        }
    }

    /// 8-byte IEEE float in the given byte order.
    pub fn f64(byte_order: ByteOrder) -> Self {
        Datatype::FloatingPoint {
            size: 8,
            byte_order,
        }
    }

    /// Little-endian signed 32-bit integer.
    pub fn i32_le() -> Self {
        Datatype::FixedPoint {
            size: 4,
            byte_order: ByteOrder::LittleEndian,
            signed: true,
        }
    }

    /// Null-terminated ASCII string of `len` bytes including the terminator.
    pub fn c_string(len: u32) -> Self {
        Datatype::String {
            size: len,
            padding: StringPadding::NullTerminate,
            charset: CharacterSet::Ascii,
        }
    }

    /// Size in bytes of one element.
    pub fn type_size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. }
            | Datatype::FloatingPoint { size, .. }
            | Datatype::String { size, .. } => *size,
        }
    }

    /// Parse a datatype message.
    pub fn parse(data: &[u8]) -> Result<Datatype, FormatError> {
        ensure_len(data, 0, 8)?;
        let class = data[0] & 0x0F;
        let bf0 = data[1];
        let size = LittleEndian::read_u32(&data[4..8]);
        let byte_order = if bf0 & 0x01 != 0 {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        };

        match class {
            0 => {
                ensure_len(data, 8, 4)?;
                Ok(Datatype::FixedPoint {
                    size,
                    byte_order,
                    signed: bf0 & 0x08 != 0,
                })
            }
            1 => {
                ensure_len(data, 8, 12)?;
                if bf0 & 0x40 != 0 {
                    return Err(FormatError::Unsupported("VAX float order".into()));
                }
                let exponent_size = data[13];
                let mantissa_size = data[15];
                match (size, exponent_size, mantissa_size) {
                    (4, 8, 23) | (8, 11, 52) => Ok(Datatype::FloatingPoint { size, byte_order }),
                    _ => Err(FormatError::Unsupported(format!(
                        "{size}-byte float with {exponent_size}-bit exponent"
                    ))),
                }
            }
            3 => {
                let padding = match bf0 & 0x0F {
                    0 => StringPadding::NullTerminate,
                    1 => StringPadding::NullPad,
                    _ => StringPadding::SpacePad,
                };
                let charset = if (bf0 >> 4) & 0x0F == 1 {
                    CharacterSet::Utf8
                } else {
                    CharacterSet::Ascii
                };
                Ok(Datatype::String {
                    size,
                    padding,
                    charset,
                })
            }
            other => Err(FormatError::UnsupportedDatatypeClass(other)),
        }
    }

    /// Serialize to datatype message bytes (version 1 encoding).
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Datatype::FixedPoint {
                size,
                byte_order,
                signed,
            } => {
                let mut bf0 = 0u8;
                if *byte_order == ByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                if *signed {
                    bf0 |= 0x08;
                }
                let mut buf = header(0, [bf0, 0, 0], *size);
                buf.extend_from_slice(&0u16.to_le_bytes());
                buf.extend_from_slice(&((size * 8) as u16).to_le_bytes());
                buf
            }
            Datatype::FloatingPoint { size, byte_order } => {
                // Mantissa normalization "implied MSB" (bits 4-5 = 2).
                let mut bf0 = 0x20u8;
                if *byte_order == ByteOrder::BigEndian {
                    bf0 |= 0x01;
                }
                let bits = size * 8;
                let sign_location = (bits - 1) as u8;
                let (exp_loc, exp_size, mant_size, bias) = if *size == 4 {
                    (23u8, 8u8, 23u8, 127u32)
                } else {
                    (52, 11, 52, 1023)
                };
                let mut buf = header(1, [bf0, sign_location, 0], *size);
                buf.extend_from_slice(&0u16.to_le_bytes());
                buf.extend_from_slice(&(bits as u16).to_le_bytes());
                buf.extend_from_slice(&[exp_loc, exp_size, 0, mant_size]);
                buf.extend_from_slice(&bias.to_le_bytes());
                buf
            }
            Datatype::String {
                size,
                padding,
                charset,
            } => {
                let pad = match padding {
                    StringPadding::NullTerminate => 0u8,
                    StringPadding::NullPad => 1,
                    StringPadding::SpacePad => 2,
                };
                let cs = match charset {
                    CharacterSet::Ascii => 0u8,
                    CharacterSet::Utf8 => 1,
                };
                header(3, [pad | (cs << 4), 0, 0], *size)
            }
        }
    }

    /// Decode packed elements of this type as f64 values.
    pub fn decode_f64(&self, raw: &[u8]) -> Result<Vec<f64>, FormatError> {
        match *self {
            Datatype::FloatingPoint { size: 4, byte_order } => Ok(raw
                .chunks_exact(4)
                .map(|c| match byte_order {
                    ByteOrder::BigEndian => BigEndian::read_f32(c) as f64,
                    ByteOrder::LittleEndian => LittleEndian::read_f32(c) as f64,
                })
                .collect()),
            Datatype::FloatingPoint { size: 8, byte_order } => Ok(raw
                .chunks_exact(8)
                .map(|c| match byte_order {
                    ByteOrder::BigEndian => BigEndian::read_f64(c),
                    ByteOrder::LittleEndian => LittleEndian::read_f64(c),
                })
                .collect()),
            _ => Ok(self.decode_i64(raw)?.into_iter().map(|v| v as f64).collect()),
        }
    }

    /// Decode packed integer elements as i64 values.
    pub fn decode_i64(&self, raw: &[u8]) -> Result<Vec<i64>, FormatError> {
        let Datatype::FixedPoint {
            size,
            byte_order,
            signed,
        } = *self
        else {
            return Err(FormatError::Unsupported(format!(
                "integer read of {self:?}"
            )));
        };
        let n = size as usize;
        if !matches!(n, 1 | 2 | 4 | 8) {
            return Err(FormatError::Unsupported(format!("{n}-byte integer")));
        }
        Ok(raw
            .chunks_exact(n)
            .map(|c| {
                let v = match byte_order {
                    ByteOrder::BigEndian => BigEndian::read_uint(c, n),
                    ByteOrder::LittleEndian => LittleEndian::read_uint(c, n),
                };
                if signed && n < 8 {
                    let shift = 64 - 8 * n as u32;
                    ((v << shift) as i64) >> shift
                } else {
                    v as i64
                }
            })
            .collect())
    }
}

fn header(class: u8, bf: [u8; 3], size: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20);
    buf.push(class | (1 << 4));
    buf.extend_from_slice(&bf);
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}
