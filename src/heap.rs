//! The allocator aggregate: one heap-extension primitive, one free-list registry, and the
//! four client-facing operations built on top of them.

use core::ptr::NonNull;

use crate::block::{tag_raw, BlockPtr, DSIZE, MIN_BLOCK_SIZE, WSIZE};
use crate::coalesce::coalesce;
use crate::extend::{extend_heap, CHUNKSIZE};
use crate::fit::find_fit;
use crate::free_list::FreeListRegistry;
use crate::placer::place;
use crate::sbrk::{HeapError, HeapExtender};

/// The 448/449-byte special case: preserved verbatim from the workload this allocator was
/// tuned against. Without it, payloads of exactly 448 or 449 bytes round to a 456-byte block
/// and fragment the 512-byte class instead of living in it cleanly.
const SPECIAL_CASE_LO: usize = 448;
const SPECIAL_CASE_HI: usize = 449;
const SPECIAL_CASE_ASIZE: usize = 512;

/// Smallest payload that still gets the minimum block size (24 bytes: header + two links +
/// footer) rather than a size computed from the request.
const SMALL_PAYLOAD_CEIL: usize = 16;

/// One allocator instance: a heap-extension primitive `E` plus the segregated free-list
/// registry built on top of it. Generic so the exact same bookkeeping logic runs against
/// either the real platform break or a deterministic in-memory mock.
pub struct Heap<E: HeapExtender> {
    extender: E,
    registry: FreeListRegistry,
    initialized: bool,
}

impl<E: HeapExtender> Heap<E> {
    pub const fn new(extender: E) -> Self {
        Self {
            extender,
            registry: FreeListRegistry::new(),
            initialized: false,
        }
    }

    /// Lays down the prologue, epilogue, and empty free lists, then extends once by
    /// `CHUNKSIZE` bytes to seed the first free block.
    ///
    /// Idempotent: a call on an already-initialized heap is a no-op returning success. On the
    /// very first call, the prologue/epilogue are written entirely in memory before the first
    /// real extension is requested; if that extension fails, nothing has been committed, so a
    /// later `init` call starts clean.
    pub fn init(&mut self) -> Result<(), HeapError> {
        if self.initialized {
            return Ok(());
        }

        // pad(4) + prologue header(4) + prologue footer(4) + epilogue header(4).
        let base = self.extender.grow(4 * WSIZE)?.as_ptr();
        unsafe {
            let prologue_hdr: *mut u32 = base.add(WSIZE).cast();
            prologue_hdr.write_unaligned(tag_raw(DSIZE, true));
            let prologue_ftr: *mut u32 = base.add(2 * WSIZE).cast();
            prologue_ftr.write_unaligned(tag_raw(DSIZE, true));
            let epilogue_hdr: *mut u32 = base.add(3 * WSIZE).cast();
            epilogue_hdr.write_unaligned(tag_raw(0, true));
        }

        self.registry = FreeListRegistry::new();

        unsafe { extend_heap(&mut self.extender, &mut self.registry, CHUNKSIZE / WSIZE) }?;
        self.initialized = true;
        Ok(())
    }

    fn ensure_initialized(&mut self) -> Result<(), HeapError> {
        if self.initialized {
            Ok(())
        } else {
            self.init()
        }
    }

    /// §4.7: adjusts `n` to a block size, finds or makes a fit, carves it, returns the
    /// payload. `n == 0` returns `None` without touching the heap.
    pub fn allocate(&mut self, n: usize) -> Option<NonNull<u8>> {
        if n == 0 {
            return None;
        }
        self.ensure_initialized().ok()?;

        let asize = adjusted_size(n);

        unsafe {
            if let Some(block) = find_fit(&self.registry, asize) {
                place(&mut self.registry, block, asize);
                return Some(NonNull::new_unchecked(block.as_ptr()));
            }

            let grow_words = core::cmp::max(asize, CHUNKSIZE) / WSIZE;
            let block = extend_heap(&mut self.extender, &mut self.registry, grow_words).ok()?;
            place(&mut self.registry, block, asize);
            Some(NonNull::new_unchecked(block.as_ptr()))
        }
    }

    /// §4.8: writes freed tags and coalesces. A null payload is a no-op.
    pub fn free(&mut self, p: Option<NonNull<u8>>) {
        let Some(p) = p else { return };
        unsafe {
            let block = BlockPtr::new(p.as_ptr());
            let size = block.size();
            block.set_tags(size, false);
            coalesce(&mut self.registry, block);
        }
    }

    /// §4.9: shrink-in-place, grow-in-place by absorbing a free next neighbour, or fall back
    /// to allocate + copy + free.
    pub fn reallocate(&mut self, p: Option<NonNull<u8>>, n: usize) -> Option<NonNull<u8>> {
        let Some(p) = p else {
            return self.allocate(n);
        };
        if n == 0 {
            self.free(Some(p));
            return None;
        }

        unsafe {
            let block = BlockPtr::new(p.as_ptr());
            let old_total = block.size();
            let old_payload = old_total - DSIZE;
            let rsize = core::cmp::max(16, round_up(n, DSIZE));

            if rsize <= old_payload {
                return Some(p);
            }

            let next = block.next_block(old_total);
            if !next.is_allocated() {
                let needed = rsize - old_payload;
                let next_size = next.size();
                if next_size >= needed {
                    self.registry.unlink(next);
                    if next_size >= needed + MIN_BLOCK_SIZE {
                        let new_total = rsize + DSIZE;
                        block.set_tags(new_total, true);
                        let remainder = block.next_block(new_total);
                        remainder.set_tags(next_size - needed, false);
                        self.registry.link(remainder);
                    } else {
                        block.set_tags(old_total + next_size, true);
                    }
                    return Some(p);
                }
            }
        }

        let new_payload = self.allocate(n)?;
        unsafe {
            let old_block = BlockPtr::new(p.as_ptr());
            let old_payload = old_block.size() - DSIZE;
            let copy_len = core::cmp::min(n, old_payload);
            core::ptr::copy_nonoverlapping(p.as_ptr(), new_payload.as_ptr(), copy_len);
        }
        self.free(Some(p));
        Some(new_payload)
    }

    /// §4.10: allocates `nmemb * size` bytes and zeroes the payload. An overflowing product is
    /// treated as allocation failure rather than wrapping into a too-small allocation.
    pub fn zeroed_allocate(&mut self, nmemb: usize, size: usize) -> Option<NonNull<u8>> {
        let total = nmemb.checked_mul(size)?;
        let p = self.allocate(total)?;
        unsafe { core::ptr::write_bytes(p.as_ptr(), 0, total) };
        Some(p)
    }

    pub(crate) fn extender(&self) -> &E {
        &self.extender
    }

    pub(crate) fn registry(&self) -> &FreeListRegistry {
        &self.registry
    }
}

fn round_up(n: usize, grain: usize) -> usize {
    (n + grain - 1) / grain * grain
}

/// §4.7's size-adjustment table.
fn adjusted_size(n: usize) -> usize {
    if n <= SMALL_PAYLOAD_CEIL {
        MIN_BLOCK_SIZE
    } else if (SPECIAL_CASE_LO..=SPECIAL_CASE_HI).contains(&n) {
        SPECIAL_CASE_ASIZE
    } else {
        round_up(n + 2 * WSIZE, DSIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbrk::MockBrk;

    fn fresh_heap(capacity: usize) -> Heap<MockBrk> {
        let mut heap = Heap::new(MockBrk::with_capacity(capacity));
        heap.init().unwrap();
        heap
    }

    #[test]
    fn adjusted_size_table() {
        assert_eq!(adjusted_size(0), MIN_BLOCK_SIZE);
        assert_eq!(adjusted_size(1), MIN_BLOCK_SIZE);
        assert_eq!(adjusted_size(16), MIN_BLOCK_SIZE);
        assert_eq!(adjusted_size(17), 24);
        assert_eq!(adjusted_size(100), 112);
        assert_eq!(adjusted_size(448), SPECIAL_CASE_ASIZE);
        assert_eq!(adjusted_size(449), SPECIAL_CASE_ASIZE);
        assert_eq!(adjusted_size(450), 464);
    }

    #[test]
    fn freed_minimum_block_is_immediately_reused() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(16).unwrap();
        assert_eq!(p.as_ptr() as usize % DSIZE, 0);
        heap.free(Some(p));
        let q = heap.allocate(16).unwrap();
        assert_eq!(q, p);
    }

    #[test]
    fn first_fit_reuse_after_freeing_the_middle_allocation() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(100).unwrap();
        let q = heap.allocate(100).unwrap();
        let _r = heap.allocate(100).unwrap();
        heap.free(Some(q));
        let s = heap.allocate(100).unwrap();
        assert_eq!(s, q);
        let _ = p;
    }

    #[test]
    fn coalescing_adjacent_frees_permits_a_larger_allocation() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(100).unwrap();
        let q = heap.allocate(100).unwrap();
        heap.free(Some(p));
        heap.free(Some(q));
        let r = heap.allocate(200).unwrap();
        assert_eq!(r, p);
    }

    #[test]
    fn allocate_448_rounds_to_the_512_byte_class() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(448).unwrap();
        unsafe {
            let block = BlockPtr::new(p.as_ptr());
            assert_eq!(block.size(), 512);
        }
    }

    #[test]
    fn zero_size_allocate_returns_none() {
        let mut heap = fresh_heap(64 * 1024);
        assert!(heap.allocate(0).is_none());
    }

    #[test]
    fn null_free_is_a_no_op() {
        let mut heap = fresh_heap(64 * 1024);
        heap.free(None);
    }

    #[test]
    fn reallocate_shrink_returns_same_pointer() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(100).unwrap();
        let q = heap.reallocate(Some(p), 10).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn reallocate_preserves_bytes_and_can_grow_in_place() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(32).unwrap();
        unsafe { core::ptr::write_bytes(p.as_ptr(), 0xAB, 32) };

        let q = heap.reallocate(Some(p), 64).unwrap();
        unsafe {
            for i in 0..32 {
                assert_eq!(*q.as_ptr().add(i), 0xAB);
            }
        }
    }

    #[test]
    fn reallocate_falls_back_to_copy_when_next_is_not_free() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(32).unwrap();
        let _pin = heap.allocate(32).unwrap(); // keeps p's neighbour allocated.
        unsafe { core::ptr::write_bytes(p.as_ptr(), 0xCD, 32) };

        let q = heap.reallocate(Some(p), 256).unwrap();
        assert_ne!(p, q);
        unsafe {
            for i in 0..32 {
                assert_eq!(*q.as_ptr().add(i), 0xCD);
            }
        }
    }

    #[test]
    fn reallocate_null_pointer_behaves_like_allocate() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.reallocate(None, 32).unwrap();
        unsafe {
            let block = BlockPtr::new(p.as_ptr());
            assert!(block.is_allocated());
        }
    }

    #[test]
    fn reallocate_zero_size_frees_and_returns_none() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.allocate(32).unwrap();
        assert!(heap.reallocate(Some(p), 0).is_none());
        let q = heap.allocate(32).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn zeroed_allocate_zeroes_the_whole_payload() {
        let mut heap = fresh_heap(64 * 1024);
        let p = heap.zeroed_allocate(10, 8).unwrap();
        unsafe {
            for i in 0..80 {
                assert_eq!(*p.as_ptr().add(i), 0);
            }
        }
    }

    #[test]
    fn zeroed_allocate_overflowing_product_fails() {
        let mut heap = fresh_heap(64 * 1024);
        assert!(heap.zeroed_allocate(usize::MAX, 2).is_none());
    }

    #[test]
    fn heap_extension_failure_is_reported_as_none() {
        let mut heap = fresh_heap(4096 + 128); // only enough for init + a little
        for _ in 0..1000 {
            if heap.allocate(4096).is_none() {
                return;
            }
        }
        panic!("expected allocation to eventually fail once the mock heap is exhausted");
    }
}
