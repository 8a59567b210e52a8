//! Helper functions that don't particularly belong to any concrete module.

/// It aligns `to_be_aligned` using `aligment`, which must be a power of two.
///
/// Used to round arena mappings up to the page size reported by
/// [`crate::platform::page_size`].
pub fn align(to_be_aligned: usize, aligment: usize) -> usize {
    (to_be_aligned + aligment - 1) & !(aligment - 1)
}
