//! Row-major layout of a dump and validation of its byte length.

use std::path::Path;

use tracing::debug;

use crate::error::{ImportError, Result};
use crate::metadata::Dimension;

/// Row-major strides in elements: `block[r-1] = 1`,
/// `block[i] = block[i+1] * dims[i+1].size`.
///
/// Returns `None` if a stride overflows `u64`. The first dimension's size
/// never enters the result, so an unlimited first dimension is fine.
pub fn block_sizes(dims: &[Dimension]) -> Option<Vec<u64>> {
    let mut blocks = vec![1u64; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        let next = u64::try_from(dims[i + 1].size).ok()?;
        blocks[i] = blocks[i + 1].checked_mul(next)?;
    }
    Some(blocks)
}

/// Validate `total_bytes` against the shape and return concrete extents.
///
/// With an unlimited first dimension the payload must be a whole number of
/// records and the first extent becomes `total / record`. Otherwise the
/// payload must match the shape exactly. Either way it must hold a whole
/// number of elements.
pub fn resolve_extents(
    path: &Path,
    dims: &[Dimension],
    blocks: &[u64],
    element_size: usize,
    total_bytes: u64,
) -> Result<Vec<u64>> {
    let elem = element_size as u64;
    let overflow = || ImportError::metadata(path, "Dimensions are too large");
    let record = blocks
        .first()
        .and_then(|b| b.checked_mul(elem))
        .ok_or_else(overflow)?;

    let mut shape: Vec<u64> = dims.iter().map(|d| d.size.max(0) as u64).collect();

    match dims.first() {
        Some(first) if first.is_unlimited() => {
            if (record == 0 && total_bytes != 0) || (record != 0 && total_bytes % record != 0) {
                return Err(ImportError::PartialRecord {
                    path: path.to_path_buf(),
                    record,
                    actual: total_bytes,
                });
            }
            shape[0] = total_bytes.checked_div(record).unwrap_or(0);
            debug!(path = %path.display(), records = shape[0], "resolved unlimited dimension");
        }
        Some(first) => {
            let expected = record.checked_mul(first.size as u64).ok_or_else(overflow)?;
            if total_bytes != expected {
                return Err(ImportError::SizeMismatch {
                    path: path.to_path_buf(),
                    expected,
                    actual: total_bytes,
                });
            }
        }
        None => return Err(ImportError::metadata(path, "Dataset has zero dimensions")),
    }

    if elem == 0 || total_bytes % elem != 0 {
        return Err(ImportError::Alignment {
            path: path.to_path_buf(),
            element_size: elem,
            actual: total_bytes,
        });
    }

    Ok(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn dims(sizes: &[i64]) -> Vec<Dimension> {
        sizes.iter().map(|&s| Dimension::new(s)).collect()
    }

    fn resolve(sizes: &[i64], elem: usize, total: u64) -> Result<Vec<u64>> {
        let d = dims(sizes);
        let blocks = block_sizes(&d).unwrap();
        resolve_extents(Path::new("dump"), &d, &blocks, elem, total)
    }

    #[test]
    fn row_major_blocks() {
        assert_eq!(block_sizes(&dims(&[2, 3, 4])).unwrap(), vec![12, 4, 1]);
        assert_eq!(block_sizes(&dims(&[-1, 4])).unwrap(), vec![4, 1]);
        assert_eq!(block_sizes(&dims(&[5])).unwrap(), vec![1]);
        assert_eq!(block_sizes(&dims(&[2, 0, 3])).unwrap(), vec![0, 3, 1]);
    }

    #[test]
    fn block_overflow() {
        assert!(block_sizes(&dims(&[1, i64::MAX, i64::MAX])).is_none());
    }

    #[test]
    fn fixed_exact() {
        assert_eq!(resolve(&[2, 3], 8, 48).unwrap(), vec![2, 3]);
    }

    #[test]
    fn fixed_mismatch() {
        let err = resolve(&[2, 3], 8, 40).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
        assert_eq!(err.to_string(), "dump: Expected size 48, but 40 found");
    }

    #[test]
    fn unlimited_resolves_first_extent() {
        assert_eq!(resolve(&[-1, 4], 4, 320).unwrap(), vec![20, 4]);
    }

    #[test]
    fn unlimited_partial_record() {
        let err = resolve(&[-1, 4], 4, 330).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    }

    #[test]
    fn unlimited_zero_record() {
        assert_eq!(resolve(&[-1, 0], 4, 0).unwrap(), vec![0, 0]);
        assert_eq!(resolve(&[-1, 0], 4, 8).unwrap_err().kind(), ErrorKind::SizeMismatch);
    }

    #[test]
    fn zero_total() {
        assert_eq!(resolve(&[-1, 4], 8, 0).unwrap(), vec![0, 4]);
        assert_eq!(resolve(&[0], 8, 0).unwrap(), vec![0]);
    }

    #[test]
    fn overflow_is_metadata_error() {
        let err = resolve(&[i64::MAX, 2], 8, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Metadata);
    }
}
