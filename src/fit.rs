//! First-fit search across the segregated free lists.

use crate::free_list::FreeListRegistry;
use crate::block::BlockPtr;
use crate::size_class::{class_for_size, NUM_CLASSES};

/// Finds a free block of size at least `asize`.
///
/// Starts at the class `asize` itself maps to and scans upward: within a class the list is
/// unordered, so every class from the request's own class through the largest must be
/// consulted — a block large enough to satisfy the request may have been coalesced into any
/// of them.
///
/// # Safety
/// Every block reachable from `registry`'s roots must have a valid header.
pub(crate) unsafe fn find_fit(registry: &FreeListRegistry, asize: usize) -> Option<BlockPtr> {
    for class in class_for_size(asize)..NUM_CLASSES {
        let mut cursor = registry.root(class);
        while let Some(block) = cursor {
            if block.size() >= asize {
                return Some(block);
            }
            cursor = block.next_free();
        }
    }
    None
}
