//! Container writers.
//!
//! Both formats sit on the same HDF5 engine. [`HierarchicalWriter`] stores
//! the dump verbatim as a big-endian dataset; [`TabularWriter`] follows the
//! netCDF-4 data model with named dimensions and double-precision variables.

mod container;
mod hierarchical;
mod tabular;

use std::path::Path;

use crate::error::Result;
use crate::metadata::DatasetDescriptor;

pub use hierarchical::HierarchicalWriter;
pub use tabular::TabularWriter;

/// A dataset ready to be written: sidecar metadata plus resolved extents.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSpec<'a> {
    pub name: &'a str,
    pub descriptor: &'a DatasetDescriptor,
    /// Concrete extents, with any unlimited dimension resolved.
    pub shape: &'a [u64],
}

/// Adds one dataset to a container file.
pub trait ContainerWriter {
    /// Write `data` as a new dataset in `container`.
    ///
    /// With `append` the existing container is opened and extended; if it
    /// cannot be opened, or without `append`, a fresh container replaces it.
    fn write(&self, container: &Path, dataset: &DatasetSpec<'_>, data: &[u8], append: bool)
        -> Result<()>;

    /// Whether `data` must be in host byte order rather than big-endian.
    fn needs_host_order(&self) -> bool;
}

/// Output format, chosen from the container's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// Plain HDF5.
    Hierarchical,
    /// netCDF-4.
    Tabular,
}

impl ContainerFormat {
    /// `.nc` (any case) selects netCDF-4; everything else is HDF5.
    pub fn from_path(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("nc") => ContainerFormat::Tabular,
            _ => ContainerFormat::Hierarchical,
        }
    }

    pub fn writer(self) -> Box<dyn ContainerWriter> {
        match self {
            ContainerFormat::Hierarchical => Box::new(HierarchicalWriter),
            ContainerFormat::Tabular => Box::new(TabularWriter),
        }
    }
}
