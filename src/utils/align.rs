//! Alignment helpers shared by the layout, the allocator and the process
//! stacks. All of them require `align` to be a power of two.

/// Align `value` up to the nearest multiple of `align`. Return `None` if
/// `align` is not a power of two or if the result would overflow.
#[must_use]
pub const fn try_align_up(value: usize, align: usize) -> Option<usize> {
    if !align.is_power_of_two() {
        return None;
    }
    match value.checked_add(align - 1) {
        Some(value) => Some(value & !(align - 1)),
        None => None,
    }
}

/// Align `value` down to the nearest multiple of `align`.
///
/// # Panics
/// Panics if `align` is not a power of two.
#[must_use]
pub const fn align_down(value: usize, align: usize) -> usize {
    assert!(align.is_power_of_two(), "Alignment must be a power of two");
    value & !(align - 1)
}

/// Check if `value` is a multiple of `align`.
///
/// # Panics
/// Panics if `align` is not a power of two.
#[must_use]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    assert!(align.is_power_of_two(), "Alignment must be a power of two");
    value & (align - 1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_the_next_boundary() {
        assert_eq!(try_align_up(0, 4096), Some(0));
        assert_eq!(try_align_up(1, 4096), Some(4096));
        assert_eq!(try_align_up(4096, 4096), Some(4096));
        assert_eq!(try_align_up(4097, 4096), Some(8192));
        assert_eq!(try_align_up(13, 4), Some(16));
    }

    #[test]
    fn try_align_up_rejects_overflow_and_bad_alignment() {
        assert_eq!(try_align_up(usize::MAX, 4096), None);
        assert_eq!(try_align_up(10, 3), None);
        assert_eq!(try_align_up(usize::MAX - 4095, 4096), Some(usize::MAX - 4095));
    }

    #[test]
    fn align_down_and_is_aligned() {
        assert_eq!(align_down(8191, 4096), 4096);
        assert!(is_aligned(0x8020_0000, 4096));
        assert!(!is_aligned(0x8020_0002, 4));
    }
}
