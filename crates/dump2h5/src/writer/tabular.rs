//! netCDF-4 output.
//!
//! netCDF-4 files are HDF5 files with conventions on top: every dimension is
//! a dataset marked `CLASS=DIMENSION_SCALE` with a `_Netcdf4Dimid`, and a
//! dimension without a coordinate variable is an empty float dataset whose
//! `NAME` says so. Variables list their dimension ids in
//! `_Netcdf4Coordinates`. Data is stored in host byte order as doubles.
//!
//! No `DIMENSION_LIST` or `REFERENCE_LIST` attributes are written: they hold
//! object references, and every append relocates object headers. Readers
//! that resolve dimensions through `_Netcdf4Coordinates` and
//! `_Netcdf4Dimid` (the netCDF-C library and tools built on it) see the
//! named dimensions. Readers that only follow dimension-scale attachments,
//! such as h5py's `dims`, see unattached dimensions.

use std::borrow::Cow;
use std::path::Path;

use dump2h5_format::{AttrValue, ByteOrder, Datatype, FileInventory, FormatError};
use tracing::{debug, info};

use super::container::Container;
use super::{ContainerWriter, DatasetSpec};
use crate::error::{ImportError, Result};
use crate::metadata::ElementType;

const NC_PROPERTIES: &str = "_NCProperties";
const DIMID: &str = "_Netcdf4Dimid";
const COORDINATES: &str = "_Netcdf4Coordinates";

/// Writes one netCDF-4 variable per dump.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct KnownDimension {
    name: String,
    size: u64,
    id: i32,
}

/// Dimensions already defined in an existing container.
fn existing_dimensions(inventory: Option<&FileInventory>) -> Vec<KnownDimension> {
    let Some(inventory) = inventory else {
        return Vec::new();
    };
    inventory
        .datasets
        .iter()
        .filter(|ds| ds.is_dimension_scale())
        .filter_map(|ds| {
            let id = ds.attribute(DIMID)?.as_i64s()?.first().copied()?;
            let size = ds.shape().ok()?.first().copied()?;
            Some(KnownDimension {
                name: ds.name.clone(),
                size,
                id: id as i32,
            })
        })
        .collect()
}

/// Name of dimension `index`: the one from the shape file, or
/// `<dataset>_dim<index>`.
pub fn dimension_name(dataset: &str, name: Option<&str>, index: usize) -> String {
    match name {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => format!("{dataset}_dim{index}"),
    }
}

/// Host-order element bytes widened to f64.
fn widen_to_f64(element_type: ElementType, data: &[u8]) -> Cow<'_, [u8]> {
    match element_type {
        ElementType::Float64 => Cow::Borrowed(data),
        ElementType::Float32 => Cow::Owned(
            data.chunks_exact(4)
                .flat_map(|c| (f32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as f64).to_ne_bytes())
                .collect(),
        ),
    }
}

impl ContainerWriter for TabularWriter {
    fn write(
        &self,
        path: &Path,
        dataset: &DatasetSpec<'_>,
        data: &[u8],
        append: bool,
    ) -> Result<()> {
        let container = Container::open(path, append)?;
        let name = dataset.name;

        let mut known = existing_dimensions(container.inventory());
        let mut next_id = known.iter().map(|d| d.id + 1).max().unwrap_or(0);
        let has_properties = container
            .inventory()
            .is_some_and(|inv| inv.root_attribute(NC_PROPERTIES).is_some());

        let mut writer = container.writer()?;

        let dim_names: Vec<String> = dataset
            .descriptor
            .dims
            .iter()
            .enumerate()
            .map(|(i, d)| dimension_name(name, d.name.as_deref(), i))
            .collect();
        let is_coordinate = dim_names.len() == 1 && dim_names[0] == name;

        let mut dimids = Vec::with_capacity(dim_names.len());
        for (dim_name, &size) in dim_names.iter().zip(dataset.shape) {
            if let Some(k) = known.iter().find(|k| &k.name == dim_name) {
                if k.size != size {
                    return Err(ImportError::library(
                        path,
                        format!("Could not define dimension \"{dim_name}\""),
                        FormatError::Unsupported(format!(
                            "resizing dimension from {} to {size}",
                            k.size
                        )),
                    ));
                }
                debug!(dimension = %dim_name, id = k.id, "reusing dimension");
                dimids.push(k.id);
                continue;
            }

            let id = next_id;
            next_id += 1;
            if !is_coordinate {
                if writer.contains(dim_name) {
                    return Err(ImportError::library(
                        path,
                        format!("Could not define dimension \"{dim_name}\""),
                        FormatError::DuplicateName(dim_name.clone()),
                    ));
                }
                writer
                    .create_dataset(dim_name)
                    .with_datatype(Datatype::f32(ByteOrder::BigEndian))
                    .with_shape(&[size])
                    .unallocated()
                    .set_attr("CLASS", AttrValue::String("DIMENSION_SCALE".into()))
                    .set_attr(
                        "NAME",
                        AttrValue::String(format!(
                            "This is a netCDF dimension but not a netCDF variable.{size:>10}"
                        )),
                    )
                    .set_attr(DIMID, AttrValue::I32(id));
                debug!(dimension = %dim_name, id, size, "defined dimension");
            }
            known.push(KnownDimension {
                name: dim_name.clone(),
                size,
                id,
            });
            dimids.push(id);
        }

        let context = || format!("Could not define variable \"{name}\"");
        if writer.contains(name) {
            return Err(ImportError::library(
                path,
                context(),
                FormatError::DuplicateName(name.to_string()),
            ));
        }

        let variable = writer
            .create_dataset(name)
            .with_datatype(Datatype::f64(ByteOrder::native()))
            .with_shape(dataset.shape);
        match widen_to_f64(dataset.descriptor.element_type, data) {
            Cow::Borrowed(bytes) => variable.with_data(bytes),
            Cow::Owned(bytes) => variable.with_owned_data(bytes),
        };
        if is_coordinate {
            variable
                .set_attr("CLASS", AttrValue::String("DIMENSION_SCALE".into()))
                .set_attr("NAME", AttrValue::String(name.to_string()))
                .set_attr(DIMID, AttrValue::I32(dimids[0]));
        } else {
            variable.set_attr(COORDINATES, AttrValue::I32Array(dimids));
        }

        if !has_properties {
            writer.set_root_attr(
                NC_PROPERTIES,
                AttrValue::String(format!("version=2,dump2h5={}", env!("CARGO_PKG_VERSION"))),
            );
        }

        let layout = writer
            .finish()
            .map_err(|e| ImportError::library(path, context(), e))?;
        let staged = container.stage(layout)?;
        drop(container);
        staged.commit()?;

        info!(
            container = %path.display(),
            variable = name,
            shape = ?dataset.shape,
            dims = ?dim_names,
            "wrote variable"
        );
        Ok(())
    }

    fn needs_host_order(&self) -> bool {
        true
    }
}
