//! Import raw big-endian float dumps into HDF5 and netCDF-4 containers.
//!
//! A dump is a flat file of 4- or 8-byte IEEE floats in row-major order,
//! described by two sidecar files next to it: `<dump>.dims` (one dimension
//! per line, `<size> [name]`, `-1` for an unlimited first dimension) and
//! `<dump>.dtype` (`float32` or `float64`). Each dump becomes one dataset
//! named after the dump's file name.
//!
//! ```no_run
//! use std::path::Path;
//! use dump2h5::{Importer, ImportOutcome};
//!
//! let importer = Importer::new("data.h5");
//! match importer.import_file(Path::new("dumps/temperature"), false)? {
//!     ImportOutcome::Written { dataset, shape } => println!("{dataset}: {shape:?}"),
//!     ImportOutcome::SkippedEmpty { dataset } => println!("{dataset}: empty"),
//! }
//! # Ok::<(), dump2h5::ImportError>(())
//! ```

pub mod acquire;
pub mod config;
pub mod endian;
pub mod error;
pub mod importer;
pub mod layout;
pub mod metadata;
pub mod report;
pub mod writer;

pub use acquire::RawBuffer;
pub use config::RunConfig;
pub use error::{ErrorKind, ImportError, Result};
pub use importer::{import_file, AppendPolicy, BatchImporter, BatchSummary, ImportOutcome, Importer};
pub use metadata::{DatasetDescriptor, Dimension, ElementType};
pub use report::Reporter;
pub use writer::{ContainerFormat, ContainerWriter, HierarchicalWriter, TabularWriter};
