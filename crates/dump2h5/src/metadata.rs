//! Sidecar metadata: `<dump>.dims` and `<dump>.dtype`.
//!
//! The shape file holds one dimension per line, `<size> [name]`, outermost
//! first. A size of `-1` marks an unlimited dimension, whose extent is
//! derived from the dump's length; only the first dimension may be
//! unlimited. The type file's first line names the element type.

use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};

/// Maximum number of dimensions read from a shape file.
pub const MAX_RANK: usize = 7;

/// Maximum length of a dimension name in characters.
pub const MAX_NAME_LEN: usize = 512;

/// Size value that marks an unlimited dimension.
pub const UNLIMITED: i64 = -1;

/// One axis of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    /// Extent, or [`UNLIMITED`].
    pub size: i64,
    pub name: Option<String>,
}

impl Dimension {
    pub fn new(size: i64) -> Self {
        Self { size, name: None }
    }

    pub fn named(size: i64, name: &str) -> Self {
        Self {
            size,
            name: Some(name.to_string()),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.size == UNLIMITED
    }
}

/// Element type of a dump. Dumps are always big-endian IEEE 754.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float32,
    Float64,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "float32" => Some(ElementType::Float32),
            "float64" => Some(ElementType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementType::Float32 => "float32",
            ElementType::Float64 => "float64",
        })
    }
}

/// Validated shape and element type of one dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub dims: Vec<Dimension>,
    pub element_type: ElementType,
}

impl DatasetDescriptor {
    /// Load the sidecars next to `dump`. A shape file with no dimensions is
    /// rejected here.
    pub fn load(dump: &Path) -> Result<Self> {
        let dims = parse_shape(&sidecar(dump, "dims"))?;
        if dims.is_empty() {
            return Err(ImportError::metadata(dump, "Dataset has zero dimensions"));
        }
        let element_type = parse_element_type(&sidecar(dump, "dtype"))?;
        Ok(Self { dims, element_type })
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// True if the first dimension is unlimited.
    pub fn is_unlimited(&self) -> bool {
        self.dims.first().is_some_and(Dimension::is_unlimited)
    }
}

/// `<dump>.<ext>`, appended to the full file name.
pub fn sidecar(dump: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(dump.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Read up to [`MAX_RANK`] dimensions from a shape file.
pub fn parse_shape(path: &Path) -> Result<Vec<Dimension>> {
    let file = File::open(path).map_err(|e| ImportError::metadata(path, e.to_string()))?;
    let mut dims = Vec::new();

    for line in BufReader::new(file).lines() {
        if dims.len() == MAX_RANK {
            break;
        }
        let line = line.map_err(|e| ImportError::metadata(path, e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (token, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let size: i64 = token
            .parse()
            .map_err(|_| ImportError::metadata(path, "Invalid dimension"))?;

        let name = rest.trim();
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ImportError::metadata(
                path,
                format!("Dimension name exceeds {MAX_NAME_LEN} characters"),
            ));
        }

        if size == UNLIMITED && !dims.is_empty() {
            return Err(ImportError::metadata(
                path,
                "Only the first dimension can be unlimited",
            ));
        }
        if size < UNLIMITED {
            return Err(ImportError::metadata(
                path,
                format!("Invalid dimension size {size}"),
            ));
        }

        dims.push(Dimension {
            size,
            name: (!name.is_empty()).then(|| name.to_string()),
        });
    }

    Ok(dims)
}

/// Read the element type from the first line of a type file.
pub fn parse_element_type(path: &Path) -> Result<ElementType> {
    let file = File::open(path).map_err(|e| ImportError::metadata(path, e.to_string()))?;
    let mut first = String::new();
    BufReader::new(file)
        .read_line(&mut first)
        .map_err(|e| ImportError::metadata(path, e.to_string()))?;
    let name = first.trim();
    ElementType::from_name(name)
        .ok_or_else(|| ImportError::metadata(path, format!("Unknown dtype \"{name}\"")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs;

    fn shape_from(text: &str) -> Result<Vec<Dimension>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dims");
        fs::write(&path, text).unwrap();
        parse_shape(&path)
    }

    fn dtype_from(text: &str) -> Result<ElementType> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dtype");
        fs::write(&path, text).unwrap();
        parse_element_type(&path)
    }

    #[test]
    fn sizes_and_names() {
        let dims = shape_from("-1 time\n4\n3   level  \n").unwrap();
        assert_eq!(
            dims,
            vec![
                Dimension::named(-1, "time"),
                Dimension::new(4),
                Dimension::named(3, "level"),
            ]
        );
    }

    #[test]
    fn blank_lines_skipped() {
        let dims = shape_from("\n2\n\n3\n").unwrap();
        assert_eq!(dims, vec![Dimension::new(2), Dimension::new(3)]);
    }

    #[test]
    fn stops_after_seven() {
        let dims = shape_from("1\n2\n3\n4\n5\n6\n7\nnot a number\n").unwrap();
        assert_eq!(dims.len(), MAX_RANK);
    }

    #[test]
    fn empty_file_has_rank_zero() {
        assert!(shape_from("").unwrap().is_empty());
    }

    #[test]
    fn unlimited_only_first() {
        let err = shape_from("4\n-1\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Metadata);
        assert!(err.to_string().ends_with("Only the first dimension can be unlimited"));
    }

    #[test]
    fn negative_size_rejected() {
        let err = shape_from("-2\n").unwrap_err();
        assert!(err.to_string().ends_with("Invalid dimension size -2"));
    }

    #[test]
    fn non_integer_rejected() {
        let err = shape_from("3\nabc\n").unwrap_err();
        assert!(err.to_string().ends_with("Invalid dimension"));
    }

    #[test]
    fn long_name_rejected() {
        let text = format!("3 {}\n", "n".repeat(MAX_NAME_LEN + 1));
        assert_eq!(shape_from(&text).unwrap_err().kind(), ErrorKind::Metadata);
        let text = format!("3 {}\n", "n".repeat(MAX_NAME_LEN));
        assert!(shape_from(&text).is_ok());
    }

    #[test]
    fn missing_file_is_metadata_error() {
        let err = parse_shape(Path::new("/nonexistent/x.dims")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Metadata);
    }

    #[test]
    fn element_types() {
        assert_eq!(dtype_from("float32\n").unwrap(), ElementType::Float32);
        assert_eq!(dtype_from("  float64  \nignored").unwrap(), ElementType::Float64);
        let err = dtype_from("int32\n").unwrap_err();
        assert!(err.to_string().ends_with("Unknown dtype \"int32\""));
        assert_eq!(dtype_from("").unwrap_err().kind(), ErrorKind::Metadata);
    }

    #[test]
    fn sidecar_appends_extension() {
        assert_eq!(sidecar(Path::new("/d/temp"), "dims"), PathBuf::from("/d/temp.dims"));
        assert_eq!(sidecar(Path::new("a.b"), "dtype"), PathBuf::from("a.b.dtype"));
    }

    #[test]
    fn descriptor_rejects_rank_zero() {
        let dir = tempfile::tempdir().unwrap();
        let dump = dir.path().join("empty");
        fs::write(sidecar(&dump, "dims"), "\n").unwrap();
        fs::write(sidecar(&dump, "dtype"), "float32\n").unwrap();
        let err = DatasetDescriptor::load(&dump).unwrap_err();
        assert!(err.to_string().ends_with("Dataset has zero dimensions"));
    }
}
