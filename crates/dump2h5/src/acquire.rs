//! Zero-copy access to dump files via `memmap2`.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut, MmapOptions};

use crate::error::{ImportError, Result};

enum Mapping {
    ReadOnly(Mmap),
    /// Private copy-on-write mapping; writes never reach the file.
    CopyOnWrite(MmapMut),
    /// Zero-length files cannot be mapped on every platform.
    Empty,
}

/// Bytes of one dump file, mapped for the duration of an import.
///
/// The mapping is released when the buffer is dropped.
pub struct RawBuffer {
    path: PathBuf,
    mapping: Mapping,
}

impl RawBuffer {
    /// Map `path` privately. With `writable`, the mapping is copy-on-write so
    /// the bytes can be converted in place without touching the file.
    pub fn acquire(path: &Path, writable: bool) -> Result<Self> {
        let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
        let len = file.metadata().map_err(|e| ImportError::io(path, e))?.len();

        let mapping = if len == 0 {
            Mapping::Empty
        } else if writable {
            // SAFETY: private mapping; other writers to the file are not
            // expected while an import runs.
            let map = unsafe { MmapOptions::new().map_copy(&file) }
                .map_err(|e| ImportError::io(path, e))?;
            Mapping::CopyOnWrite(map)
        } else {
            // SAFETY: read-only mapping; same assumption as above.
            let map = unsafe { Mmap::map(&file) }.map_err(|e| ImportError::io(path, e))?;
            Mapping::ReadOnly(map)
        };

        Ok(Self {
            path: path.to_path_buf(),
            mapping,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.mapping {
            Mapping::ReadOnly(m) => &m[..],
            Mapping::CopyOnWrite(m) => &m[..],
            Mapping::Empty => &[],
        }
    }

    /// Mutable view, available only for copy-on-write buffers.
    pub fn as_mut_bytes(&mut self) -> Option<&mut [u8]> {
        match &mut self.mapping {
            Mapping::CopyOnWrite(m) => Some(&mut m[..]),
            Mapping::Empty => Some(&mut []),
            Mapping::ReadOnly(_) => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self.mapping, Mapping::ReadOnly(_))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawBuffer")
            .field("path", &self.path)
            .field("len", &self.len())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Map a dump file. See [`RawBuffer::acquire`].
pub fn acquire(path: &Path, writable: bool) -> Result<RawBuffer> {
    RawBuffer::acquire(path, writable)
}
