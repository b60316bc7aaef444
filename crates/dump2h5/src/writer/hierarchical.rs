//! Plain HDF5 output: the dump is stored verbatim as a big-endian dataset.

use std::path::Path;

use dump2h5_format::{ByteOrder, Datatype, FormatError};
use tracing::info;

use super::container::Container;
use super::{ContainerWriter, DatasetSpec};
use crate::error::{ImportError, Result};
use crate::metadata::ElementType;

/// Writes one HDF5 dataset per dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalWriter;

impl ContainerWriter for HierarchicalWriter {
    fn write(
        &self,
        path: &Path,
        dataset: &DatasetSpec<'_>,
        data: &[u8],
        append: bool,
    ) -> Result<()> {
        let container = Container::open(path, append)?;
        let context = || format!("Could not create dataset \"{}\"", dataset.name);

        let mut writer = container.writer()?;
        if writer.contains(dataset.name) {
            return Err(ImportError::library(
                path,
                context(),
                FormatError::DuplicateName(dataset.name.to_string()),
            ));
        }

        let datatype = match dataset.descriptor.element_type {
            ElementType::Float32 => Datatype::f32(ByteOrder::BigEndian),
            ElementType::Float64 => Datatype::f64(ByteOrder::BigEndian),
        };
        writer
            .create_dataset(dataset.name)
            .with_datatype(datatype)
            .with_shape(dataset.shape)
            .with_data(data);
        let layout = writer
            .finish()
            .map_err(|e| ImportError::library(path, context(), e))?;

        let staged = container.stage(layout)?;
        drop(container);
        staged.commit()?;

        info!(
            container = %path.display(),
            dataset = dataset.name,
            shape = ?dataset.shape,
            dtype = %dataset.descriptor.element_type,
            "wrote dataset"
        );
        Ok(())
    }

    fn needs_host_order(&self) -> bool {
        false
    }
}
