//! Pure-Rust HDF5 structures for dataset containers.
//!
//! This crate covers the subset of the HDF5 file format needed to write flat
//! containers of named datasets and to re-open them for appending:
//! version 3 superblocks, version 2 object headers, compact link storage in
//! the root group, contiguous dataset storage and inline attributes. Files
//! in the older layout (version 0 and 1 superblocks, version 1 object
//! headers, symbol-table root groups) can be read and are rewritten in the
//! newer one.
//!
//! Writing goes through [`FileWriter`], which lays out metadata first and
//! keeps dataset payloads borrowed so memory-mapped input is never copied.
//! [`FileInventory`] parses a container back into its datasets.

pub mod attribute;
pub mod btree_v1;
pub mod checksum;
pub mod data_layout;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod file_reader;
pub mod file_writer;
pub mod link_message;
pub mod local_heap;
pub mod message_type;
pub mod object_header;
pub mod object_header_writer;
pub mod signature;
pub mod superblock;
pub mod symbol_table;

pub use attribute::{AttrValue, AttributeMessage};
pub use datatype::{ByteOrder, Datatype};
pub use error::FormatError;
pub use file_reader::{FileInventory, StoredDataset};
pub use file_writer::{DatasetBuilder, FileLayout, FileWriter};
