//! Import pipeline for single dumps and batches of inputs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::acquire::RawBuffer;
use crate::endian::big_endian_to_host;
use crate::error::{ImportError, Result};
use crate::layout::{block_sizes, resolve_extents};
use crate::metadata::DatasetDescriptor;
use crate::writer::{ContainerFormat, ContainerWriter, DatasetSpec};

/// Result of importing one dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Written { dataset: String, shape: Vec<u64> },
    /// The dump was empty; the container was not touched.
    SkippedEmpty { dataset: String },
}

/// Imports dumps into one output container.
pub struct Importer {
    output: PathBuf,
    writer: Box<dyn ContainerWriter>,
}

impl Importer {
    /// Select the writer from the output's file name.
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let writer = ContainerFormat::from_path(&output).writer();
        Self { output, writer }
    }

    /// Use an explicit writer regardless of the output's name.
    pub fn with_writer(output: impl Into<PathBuf>, writer: Box<dyn ContainerWriter>) -> Self {
        Self {
            output: output.into(),
            writer,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Import `dump` as a dataset named after its file name.
    ///
    /// Metadata and size are validated before the dump is mapped or the
    /// container is opened. An empty dump is skipped.
    pub fn import_file(&self, dump: &Path, append: bool) -> Result<ImportOutcome> {
        let dataset = dump
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ImportError::metadata(dump, "Invalid dataset name"))?;

        let descriptor = DatasetDescriptor::load(dump)?;
        let blocks = block_sizes(&descriptor.dims)
            .ok_or_else(|| ImportError::metadata(dump, "Dimensions are too large"))?;
        let element_size = descriptor.element_type.size();

        let total = fs::metadata(dump).map_err(|e| ImportError::io(dump, e))?.len();
        let shape = resolve_extents(dump, &descriptor.dims, &blocks, element_size, total)?;
        debug!(
            dump = %dump.display(),
            dtype = %descriptor.element_type,
            ?shape,
            bytes = total,
            "validated dump"
        );

        if total == 0 {
            info!(dump = %dump.display(), "empty dump, skipping");
            return Ok(ImportOutcome::SkippedEmpty { dataset });
        }

        let host_order = self.writer.needs_host_order();
        let mut buffer = RawBuffer::acquire(dump, host_order)?;
        if host_order {
            to_host_order(&mut buffer, element_size)?;
        }

        let spec = DatasetSpec {
            name: &dataset,
            descriptor: &descriptor,
            shape: &shape,
        };
        self.writer
            .write(&self.output, &spec, buffer.as_bytes(), append)?;

        Ok(ImportOutcome::Written { dataset, shape })
    }
}

/// Convert a big-endian dump to host order in place.
fn to_host_order(buffer: &mut RawBuffer, element_size: usize) -> Result<()> {
    let path = buffer.path().to_path_buf();
    match buffer.as_mut_bytes() {
        Some(bytes) => {
            big_endian_to_host(bytes, element_size);
            Ok(())
        }
        None => Err(ImportError::io(
            path,
            io::Error::other("dump is mapped read-only, cannot convert byte order"),
        )),
    }
}

/// Import one dump into `output`, choosing the format from its name.
pub fn import_file(output: &Path, dump: &Path, append: bool) -> Result<ImportOutcome> {
    Importer::new(output).import_file(dump, append)
}

/// Whether the first dump of a run creates the output or appends to it.
///
/// Every dump after the first always appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendPolicy {
    /// The first dump replaces any existing output.
    #[default]
    CreateFirst,
    /// The first dump is added to the existing output.
    AppendAll,
}

impl AppendPolicy {
    /// Append flag for the dump at `position` in the run.
    pub fn append_for(self, position: usize) -> bool {
        position > 0 || self == AppendPolicy::AppendAll
    }
}

/// Totals for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Sequential import of files and directories into one container.
pub struct BatchImporter {
    importer: Importer,
    policy: AppendPolicy,
}

impl BatchImporter {
    pub fn new(importer: Importer, policy: AppendPolicy) -> Self {
        Self { importer, policy }
    }

    /// Import every input in order, stopping at the first error.
    pub fn run(&self, inputs: &[PathBuf]) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut position = 0;
        for input in inputs {
            for dump in expand_input(input)? {
                let append = self.policy.append_for(position);
                position += 1;
                match self.importer.import_file(&dump, append)? {
                    ImportOutcome::Written { .. } => summary.imported += 1,
                    ImportOutcome::SkippedEmpty { .. } => summary.skipped += 1,
                }
            }
        }
        info!(
            output = %self.importer.output().display(),
            imported = summary.imported,
            skipped = summary.skipped,
            "run complete"
        );
        Ok(summary)
    }
}

/// A file stands for itself; a directory stands for its dumps.
fn expand_input(input: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(input).map_err(|e| ImportError::io(input, e))?;
    if meta.is_dir() {
        collect_dumps(input)
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

/// Direct entries of `dir` that are not directories and whose names contain
/// no `.`, in byte-wise name order. Sidecars are skipped by the name rule.
pub fn collect_dumps(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_err = |e| ImportError::io(dir, e);
    let mut dumps = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if name.to_string_lossy().contains('.') {
            continue;
        }
        dumps.push(entry.path());
    }
    dumps.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!(dir = %dir.display(), count = dumps.len(), "collected dumps");
    Ok(dumps)
}
