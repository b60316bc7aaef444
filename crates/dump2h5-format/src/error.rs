//! Error types for HDF5 container encoding and decoding.

use std::fmt;

/// Errors raised while encoding or re-opening an HDF5 container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The HDF5 magic signature was not found at any valid offset.
    SignatureNotFound,
    /// The superblock version is not one this crate can rewrite.
    UnsupportedVersion(u8),
    /// Unexpected end of data.
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// Invalid offset size (must be 2, 4, or 8).
    InvalidOffsetSize(u8),
    /// Invalid length size (must be 2, 4, or 8).
    InvalidLengthSize(u8),
    /// Invalid object header signature.
    InvalidObjectHeaderSignature,
    /// Invalid or unsupported object header version.
    InvalidObjectHeaderVersion(u8),
    /// Unknown message type that is marked as must-understand.
    UnsupportedMessage(u16),
    /// Metadata checksum mismatch.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Invalid dataspace message version.
    InvalidDataspaceVersion(u8),
    /// Invalid dataspace type byte.
    InvalidDataspaceType(u8),
    /// Datatype class this crate does not decode.
    UnsupportedDatatypeClass(u8),
    /// Invalid link message version.
    InvalidLinkVersion(u8),
    /// Invalid attribute message version.
    InvalidAttributeVersion(u8),
    /// Invalid data layout message version.
    InvalidLayoutVersion(u8),
    /// Invalid data layout class.
    InvalidLayoutClass(u8),
    /// A header message the object needs is absent.
    MissingMessage(&'static str),
    /// A file feature that cannot be carried over when the container is rewritten.
    Unsupported(String),
    /// An object with this name already exists in the group.
    DuplicateName(String),
    /// A dataset was defined without a datatype or shape.
    IncompleteDataset(String),
    /// Payload length does not match the declared shape and element size.
    DataSizeMismatch {
        /// Dataset name.
        name: String,
        /// Bytes implied by shape and datatype.
        expected: u64,
        /// Bytes supplied.
        actual: u64,
    },
    /// A header message grew beyond the 16-bit size field.
    MessageTooLarge(usize),
    /// Invalid local heap signature.
    InvalidLocalHeapSignature,
    /// Invalid local heap version.
    InvalidLocalHeapVersion(u8),
    /// Invalid B-tree v1 node signature.
    InvalidBTreeSignature,
    /// B-tree v1 node of a type other than group nodes.
    InvalidBTreeNodeType(u8),
    /// Invalid symbol table node signature.
    InvalidSymbolTableNodeSignature,
    /// Invalid symbol table node version.
    InvalidSymbolTableNodeVersion(u8),
    /// An object header or B-tree node is reachable from itself.
    CyclicStructure(u64),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureNotFound => {
                write!(f, "HDF5 signature not found at any valid offset")
            }
            FormatError::UnsupportedVersion(v) => {
                write!(f, "unsupported superblock version: {v}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need {expected} bytes, have {available}")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidObjectHeaderSignature => {
                write!(f, "invalid object header signature")
            }
            FormatError::InvalidObjectHeaderVersion(v) => {
                write!(f, "unsupported object header version: {v}")
            }
            FormatError::UnsupportedMessage(id) => {
                write!(
                    f,
                    "unsupported message type {id:#06x} marked as must-understand"
                )
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => write!(f, "invalid dataspace type: {t}"),
            FormatError::UnsupportedDatatypeClass(c) => {
                write!(f, "unsupported datatype class: {c}")
            }
            FormatError::InvalidLinkVersion(v) => write!(f, "invalid link message version: {v}"),
            FormatError::InvalidAttributeVersion(v) => {
                write!(f, "invalid attribute message version: {v}")
            }
            FormatError::InvalidLayoutVersion(v) => write!(f, "invalid data layout version: {v}"),
            FormatError::InvalidLayoutClass(c) => write!(f, "invalid data layout class: {c}"),
            FormatError::MissingMessage(what) => write!(f, "missing {what} message"),
            FormatError::Unsupported(what) => write!(f, "unsupported: {what}"),
            FormatError::DuplicateName(name) => write!(f, "object \"{name}\" already exists"),
            FormatError::IncompleteDataset(name) => {
                write!(f, "dataset \"{name}\" has no datatype or shape")
            }
            FormatError::DataSizeMismatch {
                name,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "dataset \"{name}\": expected {expected} bytes of data, got {actual}"
                )
            }
            FormatError::MessageTooLarge(len) => {
                write!(f, "header message of {len} bytes exceeds 65535")
            }
            FormatError::InvalidLocalHeapSignature => write!(f, "invalid local heap signature"),
            FormatError::InvalidLocalHeapVersion(v) => write!(f, "invalid local heap version: {v}"),
            FormatError::InvalidBTreeSignature => write!(f, "invalid B-tree signature"),
            FormatError::InvalidBTreeNodeType(t) => write!(f, "invalid B-tree node type: {t}"),
            FormatError::InvalidSymbolTableNodeSignature => {
                write!(f, "invalid symbol table node signature")
            }
            FormatError::InvalidSymbolTableNodeVersion(v) => {
                write!(f, "invalid symbol table node version: {v}")
            }
            FormatError::CyclicStructure(addr) => {
                write!(f, "structure at address {addr:#x} refers back to itself")
            }
        }
    }
}

impl std::error::Error for FormatError {}
