//! Carves a free block for an allocation request, splitting off a free remainder when worth
//! keeping.

use crate::block::MIN_BLOCK_SIZE;
use crate::block::BlockPtr;
use crate::free_list::FreeListRegistry;

/// Marks `b` (currently free, of size `csize`, linked into `registry`) allocated for a
/// request of `asize` bytes, splitting off a free tail when the remainder is still usable.
///
/// # Safety
/// `b` must be free, linked into `registry`, and `asize <= csize`.
pub(crate) unsafe fn place(registry: &mut FreeListRegistry, b: BlockPtr, asize: usize) {
    let csize = b.size();
    debug_assert!(asize <= csize);
    registry.unlink(b);

    if csize - asize >= MIN_BLOCK_SIZE {
        b.set_tags(asize, true);
        let remainder = b.next_block(asize);
        remainder.set_tags(csize - asize, false);
        registry.link(remainder);
    } else {
        b.set_tags(csize, true);
    }
}
