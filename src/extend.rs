//! Grows the heap's high end, seeds a new free block at the old epilogue, and coalesces it
//! with whatever preceded it.

use crate::block::{BlockPtr, DSIZE, WSIZE};
use crate::coalesce::coalesce;
use crate::free_list::FreeListRegistry;
use crate::sbrk::{HeapError, HeapExtender};

/// Requests `words` 4-byte words from `extender` (rounded up to an even count so the result
/// stays a multiple of 8), turns them into one new free block at the old epilogue location,
/// installs a fresh epilogue past it, coalesces, and links the survivor into `registry`.
///
/// Returns the (possibly merged) free block.
///
/// # Safety
/// `extender` must currently have a valid epilogue header at `extender.heap_high() - WSIZE`,
/// i.e. the heap must already be initialized.
pub(crate) unsafe fn extend_heap<E: HeapExtender>(
    extender: &mut E,
    registry: &mut FreeListRegistry,
    words: usize,
) -> Result<BlockPtr, HeapError> {
    let size = if words % 2 != 0 {
        (words + 1) * WSIZE
    } else {
        words * WSIZE
    };

    let old_high = extender.heap_high();
    let bp = extender.grow(size)?;
    debug_assert_eq!(bp.as_ptr() as *const u8, old_high);

    // The new block reclaims the 4 bytes of the old epilogue header as its own header; its
    // footer and the fresh epilogue header live in the newly granted bytes.
    let block = BlockPtr::new(bp.as_ptr());
    block.set_tags(size, false);

    let new_epilogue: *mut u32 = bp.as_ptr().add(size).sub(WSIZE).cast();
    debug_assert_eq!(new_epilogue.cast::<u8>(), block.next_block(size).as_ptr().sub(WSIZE));
    new_epilogue.write_unaligned(1); // size 0, allocated.

    Ok(coalesce(registry, block))
}

/// Amount requested from the extender whenever `asize` alone would fall short: 4096 bytes,
/// preserved verbatim from the workload this allocator was tuned against.
pub(crate) const CHUNKSIZE: usize = 4096;

pub(crate) const _: () = assert!(CHUNKSIZE % DSIZE == 0);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbrk::MockBrk;

    unsafe fn init_sentinels(extender: &mut MockBrk) {
        // pad(4) + prologue header(4) + prologue footer(4) + epilogue header(4)
        let base = extender.grow(4 * WSIZE).unwrap().as_ptr();
        let prologue_hdr: *mut u32 = base.add(WSIZE).cast();
        prologue_hdr.write_unaligned(crate::block::tag_raw(DSIZE, true));
        let prologue_ftr: *mut u32 = base.add(2 * WSIZE).cast();
        prologue_ftr.write_unaligned(crate::block::tag_raw(DSIZE, true));
        let epilogue_hdr: *mut u32 = base.add(3 * WSIZE).cast();
        epilogue_hdr.write_unaligned(crate::block::tag_raw(0, true));
    }

    #[test]
    fn extending_a_fresh_heap_yields_one_free_block_of_the_requested_size() {
        let mut extender = MockBrk::with_capacity(8192);
        let mut registry = FreeListRegistry::new();
        unsafe {
            init_sentinels(&mut extender);
            let block = extend_heap(&mut extender, &mut registry, CHUNKSIZE / WSIZE).unwrap();
            assert_eq!(block.size(), CHUNKSIZE);
            assert!(!block.is_allocated());
        }
    }

    #[test]
    fn extending_twice_coalesces_with_the_previous_free_tail() {
        let mut extender = MockBrk::with_capacity(3 * CHUNKSIZE);
        let mut registry = FreeListRegistry::new();
        unsafe {
            init_sentinels(&mut extender);
            let first = extend_heap(&mut extender, &mut registry, CHUNKSIZE / WSIZE).unwrap();
            registry.link(first);
            let second = extend_heap(&mut extender, &mut registry, CHUNKSIZE / WSIZE).unwrap();
            assert_eq!(second, first);
            assert_eq!(second.size(), 2 * CHUNKSIZE);
        }
    }

    #[test]
    fn reports_out_of_memory_without_mutating_on_failure() {
        let mut extender = MockBrk::with_capacity(4 * WSIZE + 16);
        let mut registry = FreeListRegistry::new();
        unsafe {
            init_sentinels(&mut extender);
            let before = extender.heap_high();
            let err = extend_heap(&mut extender, &mut registry, CHUNKSIZE / WSIZE).unwrap_err();
            assert_eq!(err, HeapError::OutOfMemory);
            assert_eq!(extender.heap_high(), before);
        }
    }
}
