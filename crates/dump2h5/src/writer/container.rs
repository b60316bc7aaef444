//! Opening and committing container files.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use dump2h5_format::{FileInventory, FileLayout, FileWriter, FormatError};
use memmap2::Mmap;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{ImportError, Result};

/// An existing container mapped for reading.
struct Existing {
    map: Mmap,
    inventory: FileInventory,
}

#[derive(Debug, thiserror::Error)]
enum OpenError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl Existing {
    fn open(path: &Path) -> std::result::Result<Self, OpenError> {
        let file = File::open(path)?;
        // SAFETY: the container is only replaced by rename, never written in
        // place, while the mapping is alive.
        let map = unsafe { Mmap::map(&file)? };
        let inventory = FileInventory::parse(&map)?;
        Ok(Self { map, inventory })
    }
}

/// Target container for one write.
pub(crate) struct Container {
    path: PathBuf,
    existing: Option<Existing>,
}

impl Container {
    /// Open `path` for modification when `append` is set. A file that is
    /// missing, unreadable or not HDF5 is replaced by a fresh container; an
    /// HDF5 file that cannot be carried over is an error and stays as is.
    pub(crate) fn open(path: &Path, append: bool) -> Result<Self> {
        let existing = if append {
            match Existing::open(path) {
                Ok(existing) => {
                    debug!(
                        container = %path.display(),
                        datasets = existing.inventory.datasets.len(),
                        "opened existing container"
                    );
                    Some(existing)
                }
                Err(e @ (OpenError::Io(_) | OpenError::Format(FormatError::SignatureNotFound))) => {
                    warn!(container = %path.display(), error = %e, "cannot open for appending, creating new file");
                    None
                }
                Err(OpenError::Format(e)) => {
                    return Err(ImportError::library(path, "Could not open file", e));
                }
            }
        } else {
            None
        };
        Ok(Self {
            path: path.to_path_buf(),
            existing,
        })
    }

    pub(crate) fn inventory(&self) -> Option<&FileInventory> {
        self.existing.as_ref().map(|e| &e.inventory)
    }

    /// A writer pre-populated with the existing contents, if any.
    pub(crate) fn writer(&self) -> Result<FileWriter<'_>> {
        match &self.existing {
            Some(e) => FileWriter::from_inventory(&e.inventory, &e.map)
                .map_err(|err| ImportError::library(&self.path, "Could not open file", err)),
            None => Ok(FileWriter::new()),
        }
    }

    /// Write `layout` out. A new container is written in place; a rewritten
    /// one goes to a sibling temporary file that replaces the original on
    /// [`Staged::commit`].
    pub(crate) fn stage(&self, layout: FileLayout<'_>) -> Result<Staged> {
        let io_err = |e| ImportError::io(&self.path, e);
        if self.existing.is_none() {
            let file = File::create(&self.path).map_err(io_err)?;
            layout.write_to(&mut BufWriter::new(file)).map_err(io_err)?;
            return Ok(Staged::Written);
        }

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix(".dump2h5-")
            .tempfile_in(dir)
            .map_err(io_err)?;
        let perms = fs::metadata(&self.path).map_err(io_err)?.permissions();
        tmp.as_file().set_permissions(perms).map_err(io_err)?;
        layout
            .write_to(&mut BufWriter::new(tmp.as_file_mut()))
            .map_err(io_err)?;
        Ok(Staged::Replace {
            tmp,
            path: self.path.clone(),
        })
    }
}

/// Output written but possibly not yet in place.
#[must_use]
pub(crate) enum Staged {
    Written,
    Replace { tmp: NamedTempFile, path: PathBuf },
}

impl Staged {
    pub(crate) fn commit(self) -> Result<()> {
        match self {
            Staged::Written => Ok(()),
            Staged::Replace { tmp, path } => {
                tmp.persist(&path)
                    .map_err(|e| ImportError::io(&path, e.error))?;
                Ok(())
            }
        }
    }
}
