//! HDF5 file signature (magic bytes).

use crate::error::FormatError;

/// The 8-byte HDF5 magic signature.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Search for the signature at offset 0 and at 512, 1024, 2048, ...
///
/// Returns the byte offset where the signature was found.
pub fn find_signature(data: &[u8]) -> Result<usize, FormatError> {
    let candidates = std::iter::once(0).chain(std::iter::successors(Some(512usize), |o| {
        o.checked_mul(2)
    }));
    for offset in candidates {
        match data.get(offset..offset + 8) {
            Some(window) if window == HDF5_SIGNATURE => return Ok(offset),
            Some(_) => continue,
            None => break,
        }
    }
    Err(FormatError::SignatureNotFound)
}
