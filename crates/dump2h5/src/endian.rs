//! In-place byte order conversion of fixed-width elements.

/// Reverse the bytes of every whole `width`-byte element in `buf`.
///
/// A trailing partial element is left untouched.
///
/// # Panics
///
/// Panics if `width` is not 2, 4 or 8.
pub fn swap_in_place(buf: &mut [u8], width: usize) {
    assert!(
        matches!(width, 2 | 4 | 8),
        "unsupported element width {width}"
    );
    for element in buf.chunks_exact_mut(width) {
        element.reverse();
    }
}

/// Convert big-endian elements to host order. A no-op on big-endian hosts.
pub fn big_endian_to_host(buf: &mut [u8], width: usize) {
    if cfg!(target_endian = "little") {
        swap_in_place(buf, width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_each_width() {
        let mut b = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap_in_place(&mut b, 2);
        assert_eq!(b, [2, 1, 4, 3, 6, 5, 8, 7]);

        let mut b = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap_in_place(&mut b, 4);
        assert_eq!(b, [4, 3, 2, 1, 8, 7, 6, 5]);

        let mut b = vec![1, 2, 3, 4, 5, 6, 7, 8];
        swap_in_place(&mut b, 8);
        assert_eq!(b, [8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn trailing_partial_element_untouched() {
        let mut b = vec![1, 2, 3, 4, 5, 6];
        swap_in_place(&mut b, 4);
        assert_eq!(b, [4, 3, 2, 1, 5, 6]);
    }

    #[test]
    fn double_swap_is_identity() {
        let orig: Vec<u8> = (0..64).collect();
        let mut b = orig.clone();
        swap_in_place(&mut b, 8);
        swap_in_place(&mut b, 8);
        assert_eq!(b, orig);
    }

    #[test]
    fn big_endian_floats_become_native() {
        let values = [1.5f64, -0.25, 1e300];
        let mut b: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        big_endian_to_host(&mut b, 8);
        let back: Vec<f64> = b
            .chunks_exact(8)
            .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(back, values);
    }

    #[test]
    #[should_panic(expected = "unsupported element width 3")]
    fn odd_width_panics() {
        swap_in_place(&mut [0; 6], 3);
    }
}
