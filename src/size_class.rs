//! Size-class classifier.
//!
//! Maps a block's total byte size to one of the eight segregated free-list buckets. The
//! table is fixed at compile time; there is no tuning knob beyond it.

/// Number of segregated free-list classes.
pub(crate) const NUM_CLASSES: usize = 8;

/// Inclusive upper bound (in bytes) of every class below the last one, which is unbounded.
const CLASS_UPPER_BOUNDS: [usize; NUM_CLASSES - 1] = [32, 64, 128, 256, 512, 1024, 2048];

/// Returns the class index `0..NUM_CLASSES` for a block of the given total size.
pub(crate) fn class_for_size(size: usize) -> usize {
    CLASS_UPPER_BOUNDS
        .iter()
        .position(|&bound| size <= bound)
        .unwrap_or(NUM_CLASSES - 1)
}
