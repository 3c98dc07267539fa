//! The four-case boundary-tag coalescer.
//!
//! Sentinels make the cases terminate without special-casing: the prologue's allocated bit
//! blocks merging below the first real block, and the epilogue's allocated bit blocks
//! merging above the last one.

use crate::block::BlockPtr;
use crate::free_list::FreeListRegistry;

/// Merges `b` (just freed, tags already written, not yet linked) with any free neighbours and
/// links the survivor into `registry` under its final size's class.
///
/// # Safety
/// `b`'s header/footer must already be written as free. Its neighbours (by address) must be
/// valid blocks, each either a real block or a sentinel.
pub(crate) unsafe fn coalesce(registry: &mut FreeListRegistry, b: BlockPtr) -> BlockPtr {
    let size = b.size();
    let prev_alloc = b.prev_footer().is_allocated();
    let next = b.next_block(size);
    let next_alloc = next.is_allocated();

    match (prev_alloc, next_alloc) {
        (true, true) => {
            registry.link(b);
            b
        }
        (true, false) => {
            registry.unlink(next);
            let new_size = size + next.size();
            b.set_tags(new_size, false);
            registry.link(b);
            b
        }
        (false, true) => {
            let prev = b.prev_block(b.prev_footer().size());
            registry.unlink(prev);
            let new_size = prev.size() + size;
            prev.set_tags(new_size, false);
            registry.link(prev);
            prev
        }
        (false, false) => {
            let prev = b.prev_block(b.prev_footer().size());
            registry.unlink(prev);
            registry.unlink(next);
            let new_size = prev.size() + size + next.size();
            prev.set_tags(new_size, false);
            registry.link(prev);
            prev
        }
    }
}
