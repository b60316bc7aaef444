//! HDF5 Dataspace message (message type 0x0001).

use crate::error::FormatError;
use crate::superblock::{ensure_len, read_sized};

/// Type of dataspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataspaceType {
    /// Scalar (single element).
    Scalar,
    /// Simple (N-dimensional array).
    Simple,
    /// Null (no data).
    Null,
}

/// Parsed HDF5 dataspace message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataspace {
    /// The type of this dataspace.
    pub space_type: DataspaceType,
    /// Current dimension sizes.
    pub dimensions: Vec<u64>,
    /// Maximum dimension sizes, if present. `u64::MAX` means unlimited.
    pub max_dimensions: Option<Vec<u64>>,
}

impl Dataspace {
    /// A scalar dataspace.
    pub fn scalar() -> Self {
        Self {
            space_type: DataspaceType::Scalar,
            dimensions: Vec::new(),
            max_dimensions: None,
        }
    }

    /// A fixed-size simple dataspace.
    pub fn simple(dimensions: &[u64]) -> Self {
        Self {
            space_type: DataspaceType::Simple,
            dimensions: dimensions.to_vec(),
            max_dimensions: None,
        }
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Parse a dataspace message from raw message bytes.
    pub fn parse(data: &[u8], length_size: u8) -> Result<Dataspace, FormatError> {
        ensure_len(data, 0, 4)?;
        let version = data[0];
        let rank = data[1] as usize;
        let flags = data[2];

        let (space_type, mut pos) = match version {
            1 => {
                let st = if rank == 0 {
                    DataspaceType::Scalar
                } else {
                    DataspaceType::Simple
                };
                (st, 8usize)
            }
            2 => {
                let st = match data[3] {
                    0 => DataspaceType::Scalar,
                    1 => DataspaceType::Simple,
                    2 => DataspaceType::Null,
                    other => return Err(FormatError::InvalidDataspaceType(other)),
                };
                (st, 4usize)
            }
            v => return Err(FormatError::InvalidDataspaceVersion(v)),
        };

        let ls = length_size as usize;
        let mut dimensions = Vec::with_capacity(rank);
        for _ in 0..rank {
            dimensions.push(read_sized(data, pos, length_size)?);
            pos += ls;
        }

        let max_dimensions = if flags & 0x01 != 0 {
            let mut max = Vec::with_capacity(rank);
            for _ in 0..rank {
                max.push(read_sized(data, pos, length_size)?);
                pos += ls;
            }
            Some(max)
        } else {
            None
        };

        Ok(Dataspace {
            space_type,
            dimensions,
            max_dimensions,
        })
    }

    /// Serialize as a version 2 dataspace message with 8-byte lengths.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + 16 * self.dimensions.len());
        buf.push(2);
        buf.push(self.dimensions.len() as u8);
        buf.push(u8::from(self.max_dimensions.is_some()));
        buf.push(match self.space_type {
            DataspaceType::Scalar => 0,
            DataspaceType::Simple => 1,
            DataspaceType::Null => 2,
        });
        for dim in &self.dimensions {
            buf.extend_from_slice(&dim.to_le_bytes());
        }
        if let Some(max) = &self.max_dimensions {
            for dim in max {
                buf.extend_from_slice(&dim.to_le_bytes());
            }
        }
        buf
    }

    /// Total number of elements. Scalar = 1, Null = 0.
    pub fn num_elements(&self) -> u64 {
        match self.space_type {
            DataspaceType::Null => 0,
            DataspaceType::Scalar => 1,
            DataspaceType::Simple => self.dimensions.iter().product(),
        }
    }
}
